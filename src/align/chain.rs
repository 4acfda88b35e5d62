//! 种子聚簇：按参考与一致对角线（容差内）聚合种子，
//! 得到每个候选局部比对的覆盖区间。

use super::seed::Seed;

/// 一簇对角线一致的种子及其覆盖范围
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub ref_id: u32,
    /// 查询覆盖 [q_min, q_max)
    pub q_min: usize,
    pub q_max: usize,
    /// 参考覆盖 [r_min, r_max)
    pub r_min: usize,
    pub r_max: usize,
    pub seed_count: usize,
}

/// 对已按 (ref_id, 对角线, qpos) 排序的种子做单遍聚簇：
/// 相邻种子对角线差不超过 tolerance 时归入同一簇。
/// 输出顺序由输入顺序决定，确定可复现。
pub fn cluster_seeds(seeds: &[Seed], k: usize, tolerance: i64) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut current: Option<(Cluster, i64)> = None;

    for s in seeds {
        let extend = match &current {
            Some((c, last_diag)) => {
                c.ref_id == s.ref_id && (s.diagonal() - last_diag).abs() <= tolerance
            }
            None => false,
        };
        if extend {
            let (c, last_diag) = current.as_mut().unwrap();
            c.q_min = c.q_min.min(s.qpos as usize);
            c.q_max = c.q_max.max(s.qpos as usize + k);
            c.r_min = c.r_min.min(s.rpos as usize);
            c.r_max = c.r_max.max(s.rpos as usize + k);
            c.seed_count += 1;
            *last_diag = s.diagonal();
        } else {
            if let Some((c, _)) = current.take() {
                clusters.push(c);
            }
            current = Some((
                Cluster {
                    ref_id: s.ref_id,
                    q_min: s.qpos as usize,
                    q_max: s.qpos as usize + k,
                    r_min: s.rpos as usize,
                    r_max: s.rpos as usize + k,
                    seed_count: 1,
                },
                s.diagonal(),
            ));
        }
    }
    if let Some((c, _)) = current.take() {
        clusters.push(c);
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(ref_id: u32, qpos: u32, rpos: u32) -> Seed {
        Seed { ref_id, qpos, rpos }
    }

    #[test]
    fn seeds_on_same_diagonal_form_one_cluster() {
        let seeds = vec![seed(0, 0, 0), seed(0, 4, 4), seed(0, 8, 8)];
        let clusters = cluster_seeds(&seeds, 4, 2);
        assert_eq!(clusters.len(), 1);
        let c = &clusters[0];
        assert_eq!((c.q_min, c.q_max), (0, 12));
        assert_eq!((c.r_min, c.r_max), (0, 12));
        assert_eq!(c.seed_count, 3);
    }

    #[test]
    fn tolerance_allows_small_diagonal_drift() {
        // 对角线 0 与 2：带一个 2bp 插入缺失的匹配
        let seeds = vec![seed(0, 0, 0), seed(0, 4, 6)];
        assert_eq!(cluster_seeds(&seeds, 4, 2).len(), 1);
        assert_eq!(cluster_seeds(&seeds, 4, 1).len(), 2);
    }

    #[test]
    fn different_references_never_merge() {
        let seeds = vec![seed(0, 0, 0), seed(1, 4, 4)];
        let clusters = cluster_seeds(&seeds, 4, 100);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].ref_id, 0);
        assert_eq!(clusters[1].ref_id, 1);
    }

    #[test]
    fn empty_input_yields_no_clusters() {
        assert!(cluster_seeds(&[], 4, 2).is_empty());
    }
}
