//! Partition upscalable images by the integer factor requested from the tool.

use std::collections::BTreeMap;

use crate::types::{Category, ImageRecord, Job};

/// Upscalable records keyed by integer scale factor, ascending
pub type ScaleGroups = BTreeMap<u32, Vec<ImageRecord>>;

/// Integer factor for a scale need: rounded up, at least 2, at most `max_factor`
pub fn scale_key(scale_needed: f64, max_factor: u32) -> u32 {
    let rounded = scale_needed.ceil().max(0.0) as u32;
    rounded.clamp(2, max_factor.max(2))
}

/// Group the upscalable records; other categories are ignored
pub fn group_by_scale(records: &[ImageRecord], max_factor: u32) -> ScaleGroups {
    let mut groups = ScaleGroups::new();

    for record in records.iter().filter(|r| r.category == Category::Upscalable) {
        groups
            .entry(scale_key(record.scale_needed, max_factor))
            .or_default()
            .push(record.clone());
    }

    groups
}

/// Flatten groups into upscale jobs, smallest factor first
pub fn upscale_jobs(groups: &ScaleGroups) -> Vec<Job> {
    groups
        .iter()
        .flat_map(|(scale, records)| records.iter().map(move |r| Job::upscale(r.path.clone(), *scale)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(name: &str, scale_needed: f64) -> ImageRecord {
        ImageRecord {
            path: PathBuf::from(name),
            width: 1,
            height: 1,
            scale_needed,
            category: Category::from_scale(scale_needed, 4),
        }
    }

    #[test]
    fn test_scale_key_rounds_up_and_clamps() {
        assert_eq!(scale_key(1.3, 4), 2);
        assert_eq!(scale_key(2.0, 4), 2);
        assert_eq!(scale_key(2.01, 4), 3);
        assert_eq!(scale_key(3.5, 4), 4);
        assert_eq!(scale_key(4.0, 4), 4);
    }

    #[test]
    fn test_group_by_scale() {
        let records = vec![
            record("a.png", 3.2),
            record("b.png", 1.5),
            record("good.png", 0.8),
            record("c.png", 2.0),
            record("too_low.png", 6.0),
            record("d.png", 2.5),
        ];

        let groups = group_by_scale(&records, 4);

        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        let names = |key: u32| {
            groups[&key]
                .iter()
                .map(|r| r.path.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(2), vec!["b.png", "c.png"]);
        assert_eq!(names(3), vec!["d.png"]);
        assert_eq!(names(4), vec!["a.png"]);
    }

    #[test]
    fn test_each_upscalable_record_lands_in_one_group() {
        let records: Vec<ImageRecord> = (1..=40)
            .map(|i| record(&format!("{}.png", i), 1.0 + f64::from(i) * 0.075))
            .collect();

        let groups = group_by_scale(&records, 4);
        let upscalable: Vec<_> = records
            .iter()
            .filter(|r| r.category == Category::Upscalable)
            .collect();

        let grouped: usize = groups.values().map(Vec::len).sum();
        assert_eq!(grouped, upscalable.len());

        for r in upscalable {
            let key = (r.scale_needed.ceil() as u32).min(4);
            assert!(key >= 2);
            assert!(groups[&key].contains(r));
        }
    }

    #[test]
    fn test_upscale_jobs_follow_group_order() {
        let records = vec![record("x.png", 3.5), record("y.png", 1.2), record("z.png", 1.9)];
        let jobs = upscale_jobs(&group_by_scale(&records, 4));

        let summary: Vec<_> = jobs
            .iter()
            .map(|j| (j.name(), j.spec.scale().unwrap()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("y.png".to_string(), 2),
                ("z.png".to_string(), 2),
                ("x.png".to_string(), 4)
            ]
        );
    }

    #[test]
    fn test_empty_input_gives_no_groups() {
        assert!(group_by_scale(&[], 4).is_empty());
        assert!(upscale_jobs(&ScaleGroups::new()).is_empty());
    }
}
