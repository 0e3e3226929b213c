use porter_model::PartInfo;

use crate::{PipelineError, Result};

/// Plan the multipart layout for `size` bytes in `chunk_size` slices.
///
/// Pure arithmetic: `ceil(size / chunk_size)` parts numbered contiguously
/// from 1. A zero chunk size is a caller contract violation.
pub fn plan_parts(size: u64, chunk_size: u64) -> Result<Vec<PartInfo>> {
    if chunk_size == 0 {
        return Err(PipelineError::Validation(
            "upload chunk size must be positive".into(),
        ));
    }
    let count = size.div_ceil(chunk_size);
    Ok((1..=count)
        .map(|n| PartInfo {
            part_number: n as u32,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_ceil_of_size_over_chunk() {
        for (size, chunk_size, expected) in [
            (1u64, 10u64, 1usize),
            (10, 10, 1),
            (11, 10, 2),
            (25 * 1024 * 1024, 10 * 1024 * 1024, 3),
            (100, 7, 15),
        ] {
            let parts = plan_parts(size, chunk_size).expect("plan");
            assert_eq!(parts.len(), expected, "size={size} chunk={chunk_size}");
        }
    }

    #[test]
    fn part_numbers_are_contiguous_from_one() {
        let parts = plan_parts(25 * 1024 * 1024, 10 * 1024 * 1024).expect("plan");
        let numbers: Vec<u32> = parts.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn empty_content_has_no_parts() {
        assert!(plan_parts(0, 10).expect("plan").is_empty());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(matches!(
            plan_parts(100, 0),
            Err(PipelineError::Validation(_))
        ));
    }
}
