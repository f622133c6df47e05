use super::LoadedBlock;

/// Markdown is loaded as one unpaged block. An empty file yields no blocks.
pub fn extract_md(bytes: &[u8]) -> Vec<LoadedBlock> {
    let text = String::from_utf8(bytes.to_vec())
        .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned());
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    vec![LoadedBlock::new(text, None)]
}
