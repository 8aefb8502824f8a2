//! Image decoding and annotation consistency checking.

use crate::{
    common::*,
    error::{DatasetError, Result},
    record::{boxes_to_array, labels_to_array, AnnotationRecord, Annotation, Image, Sample},
};
use image::RgbImage;
use std::path::Component;

/// Reads manifest records into samples.
#[derive(Debug, Clone)]
pub struct SampleReader {
    images_dir: PathBuf,
    classes: Option<Arc<IndexSet<String>>>,
}

impl SampleReader {
    /// Build a reader for images under `images_dir`.
    ///
    /// A relative directory is resolved against the current working directory.
    pub fn new(
        images_dir: impl AsRef<Path>,
        classes: Option<Arc<IndexSet<String>>>,
    ) -> Result<Self> {
        let images_dir = absolute_path(images_dir.as_ref())?;
        Ok(Self {
            images_dir,
            classes,
        })
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn classes(&self) -> Option<&Arc<IndexSet<String>>> {
        self.classes.as_ref()
    }

    /// The absolute path of the image of a record.
    pub fn image_path(&self, record: &AnnotationRecord) -> PathBuf {
        normalize_path(&self.images_dir.join(&record.filename))
    }

    /// Decode the image of a record and build its annotation.
    ///
    /// Fails if the decoded size differs from the declared size, since box
    /// coordinates are relative to the declared size.
    pub fn read(&self, record: &AnnotationRecord) -> Result<Sample> {
        let img_file = self.image_path(record);

        let rgb = image::open(&img_file)
            .map_err(|source| DatasetError::ImageDecode {
                path: img_file.clone(),
                source,
            })?
            .to_rgb8();

        let size = (rgb.width() as usize, rgb.height() as usize);
        check_size(&img_file, record.size(), size)?;

        let image = rgb_to_chw(&rgb);
        let annotation = self.annotation(record, img_file, size);

        Ok(Sample::new(image, annotation))
    }

    /// Check the declared size against the image header without decoding
    /// pixels.
    pub fn probe(&self, record: &AnnotationRecord) -> Result<()> {
        let img_file = self.image_path(record);
        let imagesize::ImageSize { width, height } =
            imagesize::size(&img_file).map_err(|err| DatasetError::ImageProbe {
                path: img_file.clone(),
                reason: format!("{:?}", err),
            })?;
        check_size(&img_file, record.size(), (width, height))
    }

    fn annotation(
        &self,
        record: &AnnotationRecord,
        img_file: PathBuf,
        size: (usize, usize),
    ) -> Annotation {
        let ann = &record.annotation;

        Annotation {
            bboxes: boxes_to_array(&ann.bboxes),
            labels: labels_to_array(&ann.labels),
            bboxes_ignore: boxes_to_array(&ann.bboxes_ignore),
            labels_ignore: ann.labels_ignore.as_deref().map(labels_to_array),
            classes: self.classes.clone(),
            ori_img_size: size,
            img_size: size,
            img_file,
        }
    }
}

fn check_size(path: &Path, expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected != actual {
        return Err(DatasetError::AnnotationMismatch {
            path: path.to_owned(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Convert interleaved RGB pixels to a `(3, h, w)` array, values kept in 0..=255.
pub(crate) fn rgb_to_chw(rgb: &RgbImage) -> Image {
    let (w, h) = rgb.dimensions();
    Array3::from_shape_fn((3, h as usize, w as usize), |(c, y, x)| {
        rgb.get_pixel(x as u32, y as u32)[c] as f32
    })
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }
    let cwd = std::env::current_dir().map_err(|err| {
        DatasetError::config(format!("unable to resolve '{}': {}", path.display(), err))
    })?;
    Ok(normalize_path(&cwd.join(path)))
}

/// Lexically drop `.` components and resolve `..` against the preceding
/// component. Symlinks are not followed.
fn normalize_path(path: &Path) -> PathBuf {
    path.components()
        .fold(PathBuf::new(), |mut normalized, component| {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    let last = normalized.components().next_back();
                    let has_parent = matches!(last, Some(Component::Normal(_)));
                    let at_root = matches!(last, Some(Component::RootDir | Component::Prefix(_)));

                    if has_parent {
                        normalized.pop();
                    } else if !at_root {
                        normalized.push(component);
                    }
                }
                component => normalized.push(component),
            }
            normalized
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Label, RawAnnotation};
    use image::Rgb;

    fn write_image(dir: &Path, name: &str, width: u32, height: u32) {
        let image = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 7]));
        image.save(dir.join(name)).unwrap();
    }

    fn record(name: &str, width: usize, height: usize) -> AnnotationRecord {
        AnnotationRecord {
            filename: name.into(),
            width,
            height,
            annotation: RawAnnotation {
                bboxes: vec![[1.0, 2.0, 3.0, 4.0]],
                labels: vec![Label(2)],
                ..Default::default()
            },
        }
    }

    #[test]
    fn read_matching_size() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "a.png", 6, 4);
        let reader = SampleReader::new(dir.path(), None).unwrap();

        let Sample { image, annotation } = reader.read(&record("a.png", 6, 4)).unwrap();
        assert_eq!(image.dim(), (3, 4, 6));
        assert_eq!(image[[0, 1, 5]], 5.0);
        assert_eq!(image[[1, 3, 2]], 3.0);
        assert_eq!(image[[2, 0, 0]], 7.0);

        assert_eq!(annotation.ori_img_size, (6, 4));
        assert_eq!(annotation.img_size, (6, 4));
        assert_eq!(annotation.bboxes.dim(), (1, 4));
        assert_eq!(annotation.labels.to_vec(), vec![2]);
        assert_eq!(annotation.bboxes_ignore.dim(), (0, 4));
        assert!(annotation.labels_ignore.is_none());
        assert_eq!(annotation.img_file, dir.path().join("a.png"));
    }

    #[test]
    fn paths_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        write_image(dir.path(), "a.png", 2, 2);

        let reader = SampleReader::new(dir.path().join("sub").join(".."), None).unwrap();
        assert_eq!(reader.images_dir(), dir.path());

        let record = record("./sub/../a.png", 2, 2);
        assert_eq!(reader.image_path(&record), dir.path().join("a.png"));
        assert!(reader.read(&record).is_ok());
    }

    #[test]
    fn normalize_keeps_leading_parent() {
        assert_eq!(normalize_path(Path::new("../a/./b/../c")), Path::new("../a/c"));
        assert_eq!(normalize_path(Path::new("/x/y/..")), Path::new("/x"));
        assert_eq!(normalize_path(Path::new("/..")), Path::new("/"));
        assert_eq!(normalize_path(Path::new("../../a")), Path::new("../../a"));
    }

    #[test]
    fn read_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "a.png", 50, 50);
        let reader = SampleReader::new(dir.path(), None).unwrap();

        let err = reader.read(&record("a.png", 100, 100)).unwrap_err();
        match err {
            DatasetError::AnnotationMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, (100, 100));
                assert_eq!(actual, (50, 50));
            }
            err => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn probe_header() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "a.png", 5, 3);
        let reader = SampleReader::new(dir.path(), None).unwrap();

        assert!(reader.probe(&record("a.png", 5, 3)).is_ok());
        assert!(matches!(
            reader.probe(&record("a.png", 3, 5)),
            Err(DatasetError::AnnotationMismatch { .. })
        ));
    }

    #[test]
    fn read_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let reader = SampleReader::new(dir.path(), None).unwrap();
        assert!(matches!(
            reader.read(&record("missing.png", 1, 1)),
            Err(DatasetError::ImageDecode { .. })
        ));
    }
}
