//! The session's image set and its reconciliation rules.

use std::collections::HashSet;

use crate::error::{NeuroPixelError, Result};
use crate::session::types::RevisionOutput;
use crate::types::{cache_busted, split_extension, Image, ImageId, ImagePatch};

/// Display name of the working copy derived from `name` (`photo.png` -> `photo_copy.png`).
pub fn copy_name(name: &str) -> String {
    match split_extension(name) {
        (base, Some(ext)) => format!("{}_copy.{}", base, ext),
        (base, None) => format!("{}_copy", base),
    }
}

/// Owned image set for one session.
///
/// All mutation goes through the methods below so the lineage invariants
/// hold: a result image always has a `source_id`, and each original has at
/// most one working copy.
#[derive(Debug, Clone, Default)]
pub struct ImageSession {
    images: Vec<Image>,
    active_id: Option<ImageId>,
}

impl ImageSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Images in insertion order
    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, id: &ImageId) -> Option<&Image> {
        self.images.iter().find(|img| &img.id == id)
    }

    pub fn contains(&self, id: &ImageId) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: &ImageId) -> Option<usize> {
        self.images.iter().position(|img| &img.id == id)
    }

    // ── Basic operations ──

    /// Insert an image and make it active.
    ///
    /// A result image whose `source_id` matches an existing result image
    /// overwrites that entry: the existing id is kept, every other field is
    /// replaced. Anything else is appended. Returns the id that became active.
    pub fn add_image(&mut self, image: Image) -> ImageId {
        if image.is_result {
            if let Some(source) = image.source_id.clone() {
                let existing = self
                    .images
                    .iter_mut()
                    .find(|img| img.is_result && img.source_id.as_ref() == Some(&source));

                if let Some(existing) = existing {
                    let id = existing.id.clone();
                    *existing = Image {
                        id: id.clone(),
                        ..image
                    };
                    tracing::debug!("Overwrote result image {} (source {})", id, source);
                    self.active_id = Some(id.clone());
                    return id;
                }
            } else {
                tracing::warn!("Result image {} has no source_id; appending", image.id);
            }
        }

        let id = image.id.clone();
        tracing::debug!("Added image {} ({})", id, image.name);
        self.images.push(image);
        self.active_id = Some(id.clone());
        id
    }

    /// Merge `patch` into the image with `id`. Returns false if it is absent.
    pub fn update_image(&mut self, id: &ImageId, patch: ImagePatch) -> bool {
        match self.images.iter_mut().find(|img| &img.id == id) {
            Some(image) => {
                patch.apply_to(image);
                true
            }
            None => false,
        }
    }

    /// Delete the image with `id`, clearing the active selection if it pointed there.
    pub fn remove_image(&mut self, id: &ImageId) -> Option<Image> {
        let idx = self.position(id)?;
        let removed = self.images.remove(idx);
        if self.active_id.as_ref() == Some(id) {
            self.active_id = None;
        }
        tracing::debug!("Removed image {}", id);
        Some(removed)
    }

    /// Replace the whole record carrying `image.id`. Returns false if it is absent.
    pub fn restore(&mut self, image: Image) -> bool {
        match self.images.iter_mut().find(|img| img.id == image.id) {
            Some(slot) => {
                *slot = image;
                true
            }
            None => false,
        }
    }

    pub fn set_active_image(&mut self, id: Option<ImageId>) {
        self.active_id = id;
    }

    pub fn active_id(&self) -> Option<&ImageId> {
        self.active_id.as_ref()
    }

    /// The active image, if the active id still names one
    pub fn active_image(&self) -> Option<&Image> {
        self.active_id.as_ref().and_then(|id| self.get(id))
    }

    // ── Lineage ──

    /// Identifier of the original at the root of `id`'s lineage.
    ///
    /// Follows `source_id` links until an original is reached. If a link
    /// points outside the session (the original was deleted) that id is
    /// still the root. Returns `None` if `id` itself is unknown.
    pub fn root_of(&self, id: &ImageId) -> Option<ImageId> {
        let mut current = self.get(id)?;
        let mut visited: HashSet<&ImageId> = HashSet::new();

        while current.is_result {
            if !visited.insert(&current.id) {
                tracing::warn!("Lineage cycle detected at image {}", current.id);
                break;
            }
            match &current.source_id {
                Some(source) => match self.get(source) {
                    Some(parent) => current = parent,
                    None => return Some(source.clone()),
                },
                None => break,
            }
        }

        Some(current.id.clone())
    }

    /// The working copy derived from `root`, if one exists
    pub fn derived_copy_of(&self, root: &ImageId) -> Option<&Image> {
        self.images
            .iter()
            .find(|img| img.is_result && img.source_id.as_ref() == Some(root))
    }

    /// Original plus every image whose lineage resolves to it
    pub fn lineage(&self, root: &ImageId) -> Vec<&Image> {
        self.images
            .iter()
            .filter(|img| &img.id == root || self.root_of(&img.id).as_ref() == Some(root))
            .collect()
    }

    // ── Reconciliation ──

    /// Fold a plugin result in, keeping the original untouched.
    ///
    /// The first run on an original inserts `<base>_copy.<ext>`. Any later
    /// run on the same lineage removes the current copy and inserts the new
    /// result at the same position, with the same display name and a
    /// `source_id` naming the root original. The new result becomes active.
    pub fn apply_copy_then_replace(
        &mut self,
        target: &ImageId,
        output: RevisionOutput,
    ) -> Result<ImageId> {
        let (target_name, target_metadata) = self
            .get(target)
            .map(|img| (img.name.clone(), img.metadata.clone()))
            .ok_or_else(|| NeuroPixelError::NotFound(format!("image '{}'", target)))?;
        let root = self.root_of(target).unwrap_or_else(|| target.clone());

        let existing = self
            .derived_copy_of(&root)
            .map(|copy| (copy.id.clone(), copy.name.clone(), copy.metadata.clone()));

        let (name, metadata, insert_at) = match existing {
            Some((copy_id, name, metadata)) => {
                let idx = self.position(&copy_id);
                self.images.retain(|img| img.id != copy_id);
                tracing::debug!("Replacing working copy {} of {}", copy_id, root);
                (name, metadata, idx)
            }
            None => (copy_name(&target_name), target_metadata, None),
        };

        let result_id = output.result_id.clone();
        let image = Image {
            id: result_id.clone(),
            name,
            thumbnail_url: output.thumbnail_or_result().to_string(),
            url: output.result_url,
            metadata,
            source_id: Some(root.clone()),
            is_result: true,
        };

        match insert_at {
            Some(idx) if idx <= self.images.len() => self.images.insert(idx, image),
            _ => self.images.push(image),
        }
        self.active_id = Some(result_id.clone());

        tracing::info!("Working copy of {} is now {}", root, result_id);
        Ok(result_id)
    }

    /// Point the target image at a plugin result without creating a new entry.
    ///
    /// Locators are cache-busted with `stamp_ms`. The caller must have
    /// recorded the previous state for undo before calling this.
    pub fn apply_in_place(
        &mut self,
        target: &ImageId,
        output: &RevisionOutput,
        stamp_ms: i64,
    ) -> Result<()> {
        let patch = ImagePatch::new()
            .url(cache_busted(&output.result_url, stamp_ms))
            .thumbnail_url(cache_busted(output.thumbnail_or_result(), stamp_ms));

        if !self.update_image(target, patch) {
            return Err(NeuroPixelError::NotFound(format!("image '{}'", target)));
        }

        tracing::info!("Rewrote image {} in place from result {}", target, output.result_id);
        Ok(())
    }
}
