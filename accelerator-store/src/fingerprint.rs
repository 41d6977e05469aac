use bytes::Bytes;

/// Content fingerprint used as the entry etag: lowercase hex MD5 of all
/// chunks fed in order, so the result does not depend on chunk boundaries.
pub fn fingerprint(chunks: &[Bytes]) -> String {
    let mut context = md5::Context::new();
    for chunk in chunks {
        context.consume(chunk);
    }
    format!("{:x}", context.compute())
}
