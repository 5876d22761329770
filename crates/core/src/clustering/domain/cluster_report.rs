use serde::{Deserialize, Serialize};

use crate::clustering::domain::people::PersonCluster;

/// A numbered group of photos. The first member represents the group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhotoGroup {
    pub cluster_id: usize,
    pub photo_filenames: Vec<String>,
    pub representative_photo: String,
}

impl PhotoGroup {
    /// Numbers clusters from 0 in the given order, skipping empty ones.
    pub fn numbered(clusters: Vec<Vec<String>>) -> Vec<PhotoGroup> {
        clusters
            .into_iter()
            .filter_map(|photo_filenames| {
                let representative_photo = photo_filenames.first()?.clone();
                Some((photo_filenames, representative_photo))
            })
            .enumerate()
            .map(|(cluster_id, (photo_filenames, representative_photo))| PhotoGroup {
                cluster_id,
                photo_filenames,
                representative_photo,
            })
            .collect()
    }
}

/// Every grouping derived from the full set of records in one run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterReport {
    pub near_duplicates: Vec<PhotoGroup>,
    pub scenes: Vec<PhotoGroup>,
    pub people: Vec<PersonCluster>,
}
