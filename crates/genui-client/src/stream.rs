use crate::error::ClientError;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Raw text chunks from a generator, exactly as they came off the wire.
pub type ChunkStream<'a> = BoxStream<'a, Result<Bytes, ClientError>>;
