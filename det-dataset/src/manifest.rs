//! Annotation manifest loading and filtering.

use crate::{
    common::*,
    error::{DatasetError, Result},
    record::AnnotationRecord,
};

/// The list of manifest records, built once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    records: Arc<Vec<AnnotationRecord>>,
}

impl AnnotationStore {
    /// Load a manifest file. Files ending with `.json5` are parsed as JSON5,
    /// others as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| DatasetError::manifest(path, err))?;

        let is_json5 = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json5"))
            .unwrap_or(false);
        let records: Vec<AnnotationRecord> = if is_json5 {
            json5::from_str(&text).map_err(|err| DatasetError::manifest(path, err))?
        } else {
            serde_json::from_str(&text).map_err(|err| DatasetError::manifest(path, err))?
        };

        records
            .iter()
            .try_for_each(AnnotationRecord::validate)
            .map_err(|reason| DatasetError::manifest(path, reason))?;

        debug!(
            "loaded {} records from '{}'",
            records.len(),
            path.display()
        );

        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<AnnotationRecord>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    /// Drop the records without any box.
    pub fn filter_empty(self) -> Self {
        let before = self.records.len();
        let records = filter_empty(&self.records);
        let dropped = before - records.len();

        if dropped > 0 {
            info!("filtered out {} records without boxes", dropped);
        }

        Self::from_records(records)
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&AnnotationRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Keep the records having at least one box, in the original order.
pub fn filter_empty(records: &[AnnotationRecord]) -> Vec<AnnotationRecord> {
    records
        .iter()
        .filter(|record| record.num_bboxes() > 0)
        .cloned()
        .collect()
}

/// Load class names from a text file, one name per line.
pub fn load_classes_file(path: impl AsRef<Path>) -> Result<IndexSet<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|err| {
        DatasetError::config(format!(
            "failed to read classes file '{}': {}",
            path.display(),
            err
        ))
    })?;
    let lines: Vec<_> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let classes: IndexSet<_> = lines.iter().map(|&line| line.to_owned()).collect();

    if lines.len() != classes.len() {
        return Err(DatasetError::config(format!(
            "duplicated class names found in '{}'",
            path.display()
        )));
    }
    if classes.is_empty() {
        return Err(DatasetError::config(format!(
            "no classes found in '{}'",
            path.display()
        )));
    }

    Ok(classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Label, RawAnnotation};

    fn record(filename: &str, num_bboxes: usize) -> AnnotationRecord {
        AnnotationRecord {
            filename: filename.into(),
            width: 8,
            height: 8,
            annotation: RawAnnotation {
                bboxes: vec![[0.0, 0.0, 4.0, 4.0]; num_bboxes],
                labels: vec![Label(0); num_bboxes],
                ..Default::default()
            },
        }
    }

    #[test]
    fn filter_empty_keeps_order() {
        let records = vec![
            record("a.png", 1),
            record("b.png", 0),
            record("c.png", 2),
            record("a.png", 3),
        ];
        let store = AnnotationStore::from_records(records).filter_empty();
        let names: Vec<_> = store
            .records()
            .iter()
            .map(|record| record.filename.to_str().unwrap())
            .collect();
        assert_eq!(names, ["a.png", "c.png", "a.png"]);
    }

    #[test]
    fn load_missing_manifest() {
        let err = AnnotationStore::load("/nonexistent/manifest.json").unwrap_err();
        assert!(matches!(err, DatasetError::ManifestLoad { .. }));
    }

    #[test]
    fn load_malformed_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, "[{ \"filename\": 3 }]").unwrap();
        let err = AnnotationStore::load(&path).unwrap_err();
        assert!(matches!(err, DatasetError::ManifestLoad { .. }));
    }

    #[test]
    fn load_rejects_label_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let text = r#"[{
            "filename": "a.png", "width": 2, "height": 2,
            "ann": { "bboxes": [[0, 0, 1, 1], [0, 0, 2, 2]], "labels": [1] }
        }]"#;
        std::fs::write(&path, text).unwrap();
        let err = AnnotationStore::load(&path).unwrap_err();
        assert!(matches!(err, DatasetError::ManifestLoad { .. }));
    }

    #[test]
    fn load_rejects_ignored_label_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let text = r#"[{
            "filename": "a.png", "width": 2, "height": 2,
            "ann": {
                "bboxes": [[0, 0, 1, 1]], "labels": [1],
                "bboxes_ignore": [[0, 0, 1, 1]], "labels_ignore": [2, 3]
            }
        }]"#;
        std::fs::write(&path, text).unwrap();
        let err = AnnotationStore::load(&path).unwrap_err();
        assert!(matches!(err, DatasetError::ManifestLoad { .. }));
    }

    #[test]
    fn ignored_boxes_without_labels_accepted() {
        let mut record = record("a.png", 1);
        record.annotation.bboxes_ignore = vec![[0.0, 0.0, 1.0, 1.0]];
        assert!(record.validate().is_ok());

        record.annotation.labels_ignore = Some(vec![]);
        assert!(record.validate().is_err());
    }

    #[test]
    fn load_json5_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json5");
        let text = r#"[
            // trailing commas and comments are allowed
            { filename: "a.png", width: 2, height: 2,
              ann: { bboxes: [[0, 0, 1, 1]], labels: [1], }, },
        ]"#;
        std::fs::write(&path, text).unwrap();
        let store = AnnotationStore::load(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().annotation.labels, vec![Label(1)]);
    }

    #[test]
    fn classes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.txt");
        std::fs::write(&path, "plane\nship\n\nstorage-tank\n").unwrap();
        let classes = load_classes_file(&path).unwrap();
        assert_eq!(classes.len(), 3);
        assert_eq!(classes.get_index_of("ship"), Some(1));

        std::fs::write(&path, "plane\nplane\n").unwrap();
        assert!(load_classes_file(&path).is_err());
    }
}
