//! Export and upload of selected rules in the JSON transfer format.

mod upload;

pub use upload::{HttpUploader, UploadError, Uploader, JSON_CONTENT_TYPE};

use std::collections::HashSet;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::feature::RuleFeature;
use crate::model::SelectableItem;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Nothing selected to export")]
    Nothing,

    #[error("Failed to serialize rules: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Persisted form of the selected rows, in display order.
pub fn collect_selected<F: RuleFeature>(
    feature: &F,
    rules: &[F::Item],
    selected_ids: &HashSet<<F::Item as SelectableItem>::Id>,
) -> Vec<F::Entity> {
    rules
        .iter()
        .filter(|item| selected_ids.contains(&item.id()))
        .map(|item| feature.rule_item_to_entity(item))
        .collect()
}

/// Serialize the selected rows and write them to `dest`.
///
/// Nothing is written when the selection matches no row.
pub async fn write_export<F, W>(
    feature: &F,
    dest: &mut W,
    rules: &[F::Item],
    selected_ids: &HashSet<<F::Item as SelectableItem>::Id>,
) -> Result<usize, ExportError>
where
    F: RuleFeature,
    W: AsyncWrite + Unpin + ?Sized,
{
    let entities = collect_selected(feature, rules, selected_ids);
    if entities.is_empty() {
        return Err(ExportError::Nothing);
    }
    let json = feature.generate_json(&entities)?;
    dest.write_all(json.as_bytes()).await?;
    dest.flush().await?;
    Ok(entities.len())
}
