use serde::{Deserialize, Serialize};

use crate::clustering::domain::cluster_error::{ensure_same_dimension, ClusterError};
use crate::clustering::domain::vector_math::faces_match;
use crate::detection::domain::detection::FaceEncoding;
use crate::features::domain::photo_record::PhotoRecord;
use crate::shared::bounding_box::BoundingBox;

/// Highest-quality face seen in a person cluster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepresentativeFace {
    pub filename: String,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub quality_score: f64,
}

/// A recurring person. `photo_filenames` is deduplicated in the order the
/// faces were encountered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonCluster {
    pub person_id: usize,
    pub photo_filenames: Vec<String>,
    pub representative_face: RepresentativeFace,
    #[serde(skip)]
    pub face_count: usize,
}

struct FaceRef<'a> {
    filename: &'a str,
    encoding: &'a FaceEncoding,
}

impl FaceRef<'_> {
    fn representative(&self) -> RepresentativeFace {
        RepresentativeFace {
            filename: self.filename.to_string(),
            bbox: self.encoding.bbox,
            quality_score: self.encoding.quality_score,
        }
    }
}

/// Greedy seed-based grouping of every face encoding across `records`.
///
/// Faces are flattened in record order. Each unclaimed face seeds a
/// cluster and claims later unclaimed faces within Euclidean `threshold`
/// of the seed. Single-face clusters are dropped; kept clusters are
/// numbered from 0.
pub fn cluster_people(
    records: &[PhotoRecord],
    threshold: f64,
) -> Result<Vec<PersonCluster>, ClusterError> {
    let faces: Vec<FaceRef> = records
        .iter()
        .flat_map(|r| {
            r.face_encodings.iter().map(move |encoding| FaceRef {
                filename: &r.filename,
                encoding,
            })
        })
        .collect();
    if faces.len() < 2 {
        return Ok(Vec::new());
    }
    ensure_same_dimension(faces.iter().map(|f| f.encoding.embedding.as_slice()))?;

    let mut claimed = vec![false; faces.len()];
    let mut clusters: Vec<PersonCluster> = Vec::new();

    for (i, seed) in faces.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        claimed[i] = true;
        let mut cluster = PersonCluster {
            person_id: clusters.len(),
            photo_filenames: vec![seed.filename.to_string()],
            representative_face: seed.representative(),
            face_count: 1,
        };

        for (j, candidate) in faces.iter().enumerate().skip(i + 1) {
            if claimed[j] {
                continue;
            }
            if !faces_match(&seed.encoding.embedding, &candidate.encoding.embedding, threshold) {
                continue;
            }
            claimed[j] = true;
            cluster.face_count += 1;
            if !cluster.photo_filenames.iter().any(|f| f == candidate.filename) {
                cluster.photo_filenames.push(candidate.filename.to_string());
            }
            if candidate.encoding.quality_score > cluster.representative_face.quality_score {
                cluster.representative_face = candidate.representative();
            }
        }

        if cluster.face_count > 1 {
            clusters.push(cluster);
        }
    }
    Ok(clusters)
}
