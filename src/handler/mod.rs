//! Request handler module
//!
//! Dispatch for every request reaching the shell: bundle assets and the shell
//! API on the virtual domain, pass-through and tunnelling for everything else.

pub mod assets;
pub mod proxy;
pub mod router;
pub mod shell_api;

pub use router::handle_request;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a request body could not be read
#[derive(Debug)]
pub enum BodyError {
    TooLarge,
    Read(BoxError),
}

/// Collect a request body, failing once it exceeds `limit` bytes
pub async fn read_body<B>(body: B, limit: u64) -> Result<Bytes, BodyError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(BodyError::TooLarge),
        Err(e) => Err(BodyError::Read(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    #[tokio::test]
    async fn test_read_body_limit() {
        let body = Full::new(Bytes::from_static(b"0123456789"));
        assert_eq!(&read_body(body, 10).await.unwrap()[..], b"0123456789");

        let body = Full::new(Bytes::from_static(b"0123456789"));
        assert!(matches!(read_body(body, 4).await, Err(BodyError::TooLarge)));
    }
}
