//! Request/reply plumbing between group members
//!
//! - [`Face`]: expresses one interest and waits for one reply
//! - [`express_with_retries`]: bounded retry loop on top of a face
//! - [`InterestRouter`]: dispatches inbound interests to [`InterestHandler`]s
//! - [`Connectivity`]: lets producers wait until the transport is up
//! - [`IrohNode`]: the above, carried over iroh connections

mod connectivity;
mod face;
mod protocol;
mod router;

pub use connectivity::Connectivity;
pub use face::{
    express_with_retries, retry_budget, BlobRelay, Face, FaceError, InterestResult,
};
pub use protocol::{InterestProtocol, IrohFace, IrohNode, ALPN};
pub use router::{InterestHandler, InterestRouter};
