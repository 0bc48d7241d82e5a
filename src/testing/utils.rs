use crate::error::{RankSumError, Result};

/// Sorted, deduplicated category levels.
pub fn extract_unique_groups<S>(group_ids: &[S]) -> Vec<S>
where
    S: Ord + Clone,
{
    let mut unique_groups = group_ids.to_vec();
    unique_groups.sort();
    unique_groups.dedup();
    unique_groups
}

/// Validated group assignment of every observation, with the group sizes derived once.
///
/// Group ids form the dense range `[0, G)`, every group has at least one observation, and
/// `G >= 2` so that each group has a non-empty complement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLabels {
    labels: Vec<usize>,
    sizes: Vec<usize>,
}

impl GroupLabels {
    pub fn new(labels: &[usize]) -> Result<Self> {
        let Some(&max_id) = labels.iter().max() else {
            return Err(RankSumError::InvalidGroupLabeling(
                "label vector is empty".into(),
            ));
        };

        let mut sizes = vec![0usize; max_id + 1];
        for &g in labels {
            sizes[g] += 1;
        }
        if let Some(empty) = sizes.iter().position(|&s| s == 0) {
            return Err(RankSumError::InvalidGroupLabeling(format!(
                "group {} has no observations; ids must form a dense range [0, {})",
                empty,
                sizes.len()
            )));
        }
        if sizes.len() < 2 {
            return Err(RankSumError::InvalidGroupLabeling(
                "at least two groups are required".into(),
            ));
        }

        Ok(GroupLabels {
            labels: labels.to_vec(),
            sizes,
        })
    }

    /// Maps arbitrary category labels to dense ids in sorted level order.
    ///
    /// Returns the labels together with the level for each id.
    pub fn from_categories<S>(categories: &[S]) -> Result<(Self, Vec<S>)>
    where
        S: Ord + Clone,
    {
        let levels = extract_unique_groups(categories);
        let ids: Vec<usize> = categories
            .iter()
            .map(|c| levels.binary_search(c).unwrap_or_default())
            .collect();
        Ok((Self::new(&ids)?, levels))
    }

    /// Keeps only observations whose group is in `groups`, re-indexing the kept groups densely
    /// in ascending id order. Returns the new labels and the indices of the kept observations.
    pub fn restrict(&self, groups: &[usize]) -> Result<(GroupLabels, Vec<usize>)> {
        let keep = extract_unique_groups(groups);
        if let Some(&bad) = keep.iter().find(|&&g| g >= self.n_groups()) {
            return Err(RankSumError::InvalidGroupLabeling(format!(
                "requested group {} but only {} groups exist",
                bad,
                self.n_groups()
            )));
        }

        let mut remap = vec![None; self.n_groups()];
        for (new_id, &old_id) in keep.iter().enumerate() {
            remap[old_id] = Some(new_id);
        }

        let mut observations = Vec::new();
        let mut new_labels = Vec::new();
        for (obs, &g) in self.labels.iter().enumerate() {
            if let Some(new_id) = remap[g] {
                observations.push(obs);
                new_labels.push(new_id);
            }
        }
        Ok((GroupLabels::new(&new_labels)?, observations))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_groups(&self) -> usize {
        self.sizes.len()
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    #[inline]
    pub fn group_of(&self, observation: usize) -> usize {
        self.labels[observation]
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Total number of observations, `N`.
    pub fn total(&self) -> usize {
        self.labels.len()
    }
}
