use std::path::Path;

use anyhow::Context;
use upload_core::SelectedFile;
use upload_engine::load_image_file;

/// Reads a picked file into the controller's `SelectedFile`, with a `file://` preview reference.
pub fn load_selected_file(path: &Path) -> anyhow::Result<SelectedFile> {
    let image = load_image_file(path)?;
    let preview = image
        .preview_url()
        .with_context(|| format!("cannot reference {} as a file URL", image.path.display()))?;
    Ok(SelectedFile::new(image.name, image.mime, image.bytes, preview))
}
