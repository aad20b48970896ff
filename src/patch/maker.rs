use super::options::CalculateOption;
use super::result::PatchResult;
use crate::annotation::Annotator;
use crate::error::{Error, Result, ResultExt};
use crate::object::ResourceObject;
use crate::prune::prune_json;
use crate::strategic::{
    create_three_way_json_merge_patch, create_three_way_merge_patch, create_two_way_merge_patch,
    strategic_merge_patch, Catalog, MergeStrategy,
};
use crate::value::{self, Value};
use tracing::{debug, trace};

/// PatchMaker calculates the patch that would turn a live object into the
/// desired one.
#[derive(Debug, Clone, Default)]
pub struct PatchMaker {
    annotator: Annotator,
    catalog: Catalog,
}

impl PatchMaker {
    pub fn new(annotator: Annotator, catalog: Catalog) -> Self {
        PatchMaker { annotator, catalog }
    }

    pub fn annotator(&self) -> &Annotator {
        &self.annotator
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Calculates the three-way patch between the live `current` object,
    /// the desired `modified` object and the last applied configuration
    /// stored on `current`.
    ///
    /// The options run, in order, on the serialized pair before pruning.
    /// The original configuration goes through each option's
    /// `apply_original` only.
    pub fn calculate(
        &self,
        current: &ResourceObject,
        modified: &ResourceObject,
        opts: &[Box<dyn CalculateOption>],
    ) -> Result<PatchResult> {
        let object = match modified.display_name() {
            name if name.is_empty() => current.display_name(),
            name => name,
        };
        let codec = self.annotator.codec();

        let mut current_bytes = codec
            .marshal(current)
            .context("failed to convert current object to byte sequence", &object)?;
        let mut modified_bytes = codec
            .marshal(modified)
            .context("failed to convert modified object to byte sequence", &object)?;

        let original = self
            .annotator
            .get_original_configuration(current)
            .context("failed to get original configuration", &object)?;
        let mut original_bytes = original.clone().filter(|bytes| !bytes.is_empty());

        // The original only sees the rewrites an option declares for it, so a
        // field hidden from the comparison is not reported as deleted either.
        for opt in opts {
            trace!(object = %object, option = opt.name(), "applying calculate option");
            let stage_error = |e: Error| Error::Option {
                stage: opt.name().to_string(),
                object: object.clone(),
                source: Box::new(e),
            };
            if let Some(bytes) = original_bytes.take() {
                original_bytes = Some(
                    opt.apply_original(bytes, &current_bytes, &modified_bytes)
                        .map_err(stage_error)?,
                );
            }
            (current_bytes, modified_bytes) =
                opt.apply(current_bytes, modified_bytes).map_err(stage_error)?;
        }

        let (current_bytes, current_map) = prune_json(&current_bytes)
            .context("failed to delete null from current object", &object)?;
        let (modified_bytes, modified_map) = prune_json(&modified_bytes)
            .context("failed to delete null from modified object", &object)?;
        let original_map = match original_bytes {
            Some(bytes) => Some(
                prune_json(&bytes)
                    .map(|(_, map)| map)
                    .context("failed to decode original configuration", &object)?,
            ),
            None => None,
        };

        let strategy = if modified.kind().is_empty() {
            self.catalog.strategy(current.api_version(), current.kind())
        } else {
            self.catalog.strategy(modified.api_version(), modified.kind())
        };

        let patch = match &strategy {
            MergeStrategy::Strategic(meta) => {
                let patch = create_three_way_merge_patch(
                    original_map.as_ref(),
                    &modified_map,
                    &current_map,
                    meta,
                )
                .context("failed to generate strategic merge patch", &object)?;

                // $setElementOrder alone can make the patch look non-empty.
                // Applying it to current tells whether anything would change.
                if patch.is_empty() {
                    patch
                } else {
                    let patched = strategic_merge_patch(&current_map, &patch, meta).context(
                        "failed to apply patch again to check for an actual diff",
                        &object,
                    )?;
                    let recheck = create_two_way_merge_patch(&current_map, &patched, meta)
                        .context("failed to create patch again to check for an actual diff", &object)?;
                    if recheck.is_empty() {
                        debug!(object = %object, "discarding patch without effect");
                        recheck
                    } else {
                        patch
                    }
                }
            }
            MergeStrategy::JsonMerge => {
                create_three_way_json_merge_patch(original_map.as_ref(), &modified_map, &current_map)
            }
        };

        let patch = value::to_vec(&Value::Map(patch))
            .map_err(|e| Error::encoding("failed to encode patch", e))?;

        debug!(
            object = %object,
            kind = modified.kind(),
            strategy = strategy.name(),
            patch = %String::from_utf8_lossy(&patch),
            "calculated patch"
        );

        Ok(PatchResult {
            patch,
            current: current_bytes,
            modified: modified_bytes,
            original,
        })
    }
}
