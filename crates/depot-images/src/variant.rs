//! Image variant resolution
//!
//! A single-request state machine: canonicalize the requested size onto the
//! alignment grid, fall back to a placeholder when the source raster is gone,
//! otherwise ensure the variant exists on disk and hand back its public URL.
//! Variant generation is deterministic, so concurrent cache misses on the
//! same size may both write the target path; last writer wins.

use std::path::Path;

use depot_core::align::align;
use depot_core::config::DepotConfig;
use depot_core::error::{DepotError, DepotResult};
use depot_files::model::FileRecord;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use tracing::{debug, info, instrument};

/// Terminal outcome of one resize request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// Requested size was off-grid; redirect to the canonical aligned URL
    RedirectAligned { width: u32, height: u32 },
    /// Source raster is missing on disk; degrade to a placeholder image
    RedirectPlaceholder { url: String },
    /// Variant exists (or was just generated); redirect to its public URL
    RedirectAsset { url: String },
}

/// Resolves resize requests against the variant cache
pub struct VariantResolver {
    config: DepotConfig,
}

impl VariantResolver {
    pub fn new(config: DepotConfig) -> Self {
        Self { config }
    }

    /// Relative variant location under the static root:
    /// `image/resize/{w}/{h}/{p1}/{p2}/{id}{ext}`
    ///
    /// The scheme is load-bearing: cache-hit detection and the public URL
    /// both derive from it.
    pub fn variant_rel_path(record: &FileRecord, width: u32, height: u32) -> DepotResult<String> {
        let id = record
            .id
            .as_deref()
            .ok_or_else(|| DepotError::InvalidIdentifier("unsaved record".to_string()))?;
        if id.len() < 4 {
            return Err(DepotError::InvalidIdentifier(id.to_string()));
        }

        let extension = Path::new(&record.path)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        Ok(format!(
            "image/resize/{}/{}/{}/{}/{}{}",
            width,
            height,
            &id[0..2],
            &id[2..4],
            id,
            extension
        ))
    }

    /// Resolve one resize request to its terminal outcome
    #[instrument(skip(self, record), fields(id = ?record.id))]
    pub fn resolve(
        &self,
        record: &FileRecord,
        requested_width: i64,
        requested_height: i64,
    ) -> DepotResult<ResizeOutcome> {
        if requested_width < 0 || requested_height < 0 {
            return Err(DepotError::InvalidDimensions(format!(
                "width and height must be non-negative, got {}x{}",
                requested_width, requested_height
            )));
        }

        let attrs = record.image().ok_or_else(|| {
            DepotError::NotFound(record.uid().unwrap_or_else(|| record.path.clone()))
        })?;

        let images = &self.config.images;

        // Canonicalize onto the alignment grid first; every cached variant
        // lives at a grid-aligned size.
        let aligned_width = align(requested_width, images.resize_limit_width, images.resize_step);
        let aligned_height = align(
            requested_height,
            images.resize_limit_height,
            images.resize_step,
        );
        if aligned_width as i64 != requested_width || aligned_height as i64 != requested_height {
            return Ok(ResizeOutcome::RedirectAligned {
                width: aligned_width,
                height: aligned_height,
            });
        }

        let requested_width = aligned_width;
        let requested_height = aligned_height;

        let (orig_width, orig_height) = (attrs.width, attrs.height);
        let orig_ratio = orig_width as f64 / orig_height as f64;

        // Target raster size
        let mut need_resize = true;
        let (resize_width, resize_height) = match (requested_width, requested_height) {
            (0, 0) => {
                need_resize = false;
                (orig_width, orig_height)
            }
            (w, 0) => (w, (w as f64 / orig_ratio).floor() as u32),
            (0, h) => ((h as f64 * orig_ratio).floor() as u32, h),
            (w, h) => (w, h),
        };

        let source = self.config.paths.storage_root.join(&record.path);
        if !source.exists() {
            return Ok(ResizeOutcome::RedirectPlaceholder {
                url: format!(
                    "{}/{}x{}",
                    images.placeholder_url, requested_width, requested_height
                ),
            });
        }

        let rel = Self::variant_rel_path(record, requested_width, requested_height)?;
        let target = self.config.paths.static_root.join(&rel);

        if target.exists() {
            debug!(variant = %rel, "variant cache hit");
        } else {
            self.generate(&source, &target, resize_width, resize_height, need_resize)?;
            info!(
                variant = %rel,
                width = resize_width,
                height = resize_height,
                "variant generated"
            );
        }

        Ok(ResizeOutcome::RedirectAsset {
            url: format!("{}/{}", self.config.paths.static_url, rel),
        })
    }

    /// Materialize the variant at `target`
    fn generate(
        &self,
        source: &Path,
        target: &Path,
        resize_width: u32,
        resize_height: u32,
        need_resize: bool,
    ) -> DepotResult<()> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if !need_resize {
            // Original size requested: persist the original bytes verbatim
            std::fs::copy(source, target)?;
            return Ok(());
        }

        let img = ImageReader::open(source)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| DepotError::Image(e.to_string()))?;

        let resized = crop_to_ratio(&img, resize_width, resize_height)
            .resize_exact(resize_width, resize_height, FilterType::Triangle);

        resized
            .save(target)
            .map_err(|e| DepotError::Image(e.to_string()))?;

        Ok(())
    }
}

/// Center-crop `img` to the aspect ratio of the target size.
///
/// Starts from the full source width and derives the crop height; when that
/// spills past the source, inverts to a height-first crop. Centering is on
/// whichever axis was not the basis.
fn crop_to_ratio(img: &DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
    let orig_width = img.width() as i64;
    let orig_height = img.height() as i64;

    let crop_ratio = target_width as f64 / target_height as f64;

    let mut crop_width = orig_width;
    let mut crop_height = (crop_width as f64 / crop_ratio).floor() as i64;
    let mut crop_top = orig_height / 2 - crop_height / 2;
    let mut crop_left = 0i64;

    if crop_height > orig_height {
        crop_height = orig_height;
        crop_width = (crop_height as f64 * crop_ratio).floor() as i64;
        crop_top = 0;
        crop_left = orig_width / 2 - crop_width / 2;
    }

    img.crop_imm(
        crop_left.max(0) as u32,
        crop_top.max(0) as u32,
        crop_width as u32,
        crop_height as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_files::model::FileKind;
    use image::{ImageFormat, RgbImage};
    use std::path::PathBuf;

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("depot-variant-tests")
            .join(label)
            .join(uuid::Uuid::new_v4().simple().to_string());
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn fixture(width: u32, height: u32) -> (DepotConfig, FileRecord) {
        let mut config = DepotConfig::default();
        config.paths.storage_root = temp_dir("storage");
        config.paths.static_root = temp_dir("static");

        let rel = "image/ab/cd/0123456789abcdef.png";
        let abs = config.paths.storage_root.join(rel);
        std::fs::create_dir_all(abs.parent().unwrap()).unwrap();
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 251) as u8, (y % 241) as u8, ((x + y) % 239) as u8])
        }));
        img.save_with_format(&abs, ImageFormat::Png).unwrap();

        let mut record = FileRecord::new(FileKind::Image, rel, "pic.png", "image/png", 1);
        record.id = Some("0123456789abcdef0123456789abcdef".to_string());
        if let Some(attrs) = record.image_mut() {
            attrs.width = width;
            attrs.height = height;
        }

        (config, record)
    }

    #[test]
    fn test_unaligned_request_redirects_once_to_fixed_point() {
        let (config, record) = fixture(1600, 900);
        let resolver = VariantResolver::new(config.clone());

        let outcome = resolver.resolve(&record, 101, 333).unwrap();
        let ResizeOutcome::RedirectAligned { width, height } = outcome else {
            panic!("expected aligned redirect, got {:?}", outcome);
        };
        assert_eq!((width, height), (150, 350));

        // The aligned size is a fixed point: following the redirect converges
        // in exactly one hop.
        let followed = resolver.resolve(&record, width as i64, height as i64).unwrap();
        assert!(matches!(followed, ResizeOutcome::RedirectAsset { .. }));
    }

    #[test]
    fn test_width_only_preserves_aspect_ratio() {
        let (config, record) = fixture(1600, 900);
        let resolver = VariantResolver::new(config.clone());

        let outcome = resolver.resolve(&record, 300, 0).unwrap();
        let ResizeOutcome::RedirectAsset { url } = outcome else {
            panic!("expected asset redirect, got {:?}", outcome);
        };
        assert_eq!(
            url,
            "/static/image/resize/300/0/01/23/0123456789abcdef0123456789abcdef.png"
        );

        // floor(300 / (1600/900)) = 168.75 -> 168; the stored raster matches
        let rel = VariantResolver::variant_rel_path(&record, 300, 0).unwrap();
        let generated = ImageReader::open(config.paths.static_root.join(rel))
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!((generated.width(), generated.height()), (300, 168));
    }

    #[test]
    fn test_original_size_copies_bytes_verbatim() {
        let (config, record) = fixture(64, 48);
        let resolver = VariantResolver::new(config.clone());

        let outcome = resolver.resolve(&record, 0, 0).unwrap();
        assert!(matches!(outcome, ResizeOutcome::RedirectAsset { .. }));

        let rel = VariantResolver::variant_rel_path(&record, 0, 0).unwrap();
        let original = std::fs::read(config.paths.storage_root.join(&record.path)).unwrap();
        let variant = std::fs::read(config.paths.static_root.join(rel)).unwrap();
        assert_eq!(original, variant);
    }

    #[test]
    fn test_missing_source_degrades_to_placeholder() {
        let (config, record) = fixture(64, 48);
        std::fs::remove_file(config.paths.storage_root.join(&record.path)).unwrap();
        let resolver = VariantResolver::new(config);

        let outcome = resolver.resolve(&record, 100, 50).unwrap();
        assert_eq!(
            outcome,
            ResizeOutcome::RedirectPlaceholder {
                url: "http://placehold.it/100x50".to_string()
            }
        );
    }

    #[test]
    fn test_cache_hit_short_circuits() {
        let (config, record) = fixture(640, 480);
        let resolver = VariantResolver::new(config.clone());

        resolver.resolve(&record, 100, 100).unwrap();
        let rel = VariantResolver::variant_rel_path(&record, 100, 100).unwrap();
        let target = config.paths.static_root.join(&rel);
        let first_written = std::fs::metadata(&target).unwrap().modified().unwrap();

        // Second request reuses the variant without rewriting it
        resolver.resolve(&record, 100, 100).unwrap();
        let second_written = std::fs::metadata(&target).unwrap().modified().unwrap();
        assert_eq!(first_written, second_written);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let (config, record) = fixture(640, 480);
        let resolver = VariantResolver::new(config.clone());

        let rel = VariantResolver::variant_rel_path(&record, 150, 100).unwrap();
        let target = config.paths.static_root.join(&rel);

        resolver.resolve(&record, 150, 100).unwrap();
        let first = std::fs::read(&target).unwrap();

        std::fs::remove_file(&target).unwrap();
        resolver.resolve(&record, 150, 100).unwrap();
        let second = std::fs::read(&target).unwrap();

        assert_eq!(first, second, "regenerated variant must be byte-identical");
    }

    #[test]
    fn test_exact_size_crops_then_resizes() {
        let (config, record) = fixture(400, 100);
        let resolver = VariantResolver::new(config.clone());

        // Tall target from a wide source forces the height-first crop branch
        resolver.resolve(&record, 50, 100).unwrap();
        let rel = VariantResolver::variant_rel_path(&record, 50, 100).unwrap();
        let generated = ImageReader::open(config.paths.static_root.join(rel))
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!((generated.width(), generated.height()), (50, 100));
    }

    #[test]
    fn test_negative_dimensions_rejected() {
        let (config, record) = fixture(64, 48);
        let resolver = VariantResolver::new(config);

        let result = resolver.resolve(&record, -5, 10);
        assert!(matches!(result, Err(DepotError::InvalidDimensions(_))));
    }

    #[test]
    fn test_crop_to_ratio_bounds() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(400, 100));

        // Wide target: width-first crop fits
        let cropped = crop_to_ratio(&img, 200, 50);
        assert_eq!((cropped.width(), cropped.height()), (400, 100));

        // Tall target: inverted, height-first crop
        let cropped = crop_to_ratio(&img, 50, 100);
        assert_eq!((cropped.width(), cropped.height()), (50, 100));
    }
}
