//! 种子延伸比对器。
//!
//! 每次比对请求经过固定的阶段：种子查找 -> 聚簇延伸 -> 打分筛选 ->
//! 输出最优命中或 NoMatch。NoMatch 是一等终止状态，不是错误。
//!
//! 生命周期：`KAligner::new(params)` 后逐条 `add_reference`，
//! `build_index` 一次性建 k-mer 索引，此后索引只读，`align`
//! 可在任意线程并发调用。

pub mod chain;
pub mod extend;
pub mod scoring;
pub mod seed;

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::{IndexMeta, KmerIndex};
use crate::mutation::{Mutation, Mutations};
use crate::seq::{Alphabet, Sequence};
use chain::cluster_seeds;
use extend::{banded_extend_with_buf, ops_to_cigar, AlignOp, ExtendBuffer};
use scoring::AffineGapScoring;
use seed::collect_seeds;

/// 比对器配置。常数（种子对角线容差、最低分阈值、带宽）均由
/// 外部配置提供，不在库内硬编码。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KAlignerParams {
    /// k-mer 长度
    pub k: usize,
    /// 同簇种子允许的对角线漂移
    pub seed_diagonal_tolerance: i64,
    /// 延伸 DP 带宽，亦即允许的最大间隙宽度
    pub max_gap_width: usize,
    /// 低于该分数的候选被丢弃
    pub min_score: i32,
    pub scoring: AffineGapScoring,
}

impl Default for KAlignerParams {
    fn default() -> Self {
        Self {
            k: 10,
            seed_diagonal_tolerance: 4,
            max_gap_width: 16,
            min_score: 15,
            scoring: AffineGapScoring::default(),
        }
    }
}

impl KAlignerParams {
    /// 启动前校验，非法配置致命
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidConfig("k must be positive".to_string()));
        }
        if self.seed_diagonal_tolerance < 0 {
            return Err(Error::InvalidConfig(
                "seed_diagonal_tolerance must be non-negative".to_string(),
            ));
        }
        if self.max_gap_width == 0 {
            return Err(Error::InvalidConfig(
                "max_gap_width must be positive".to_string(),
            ));
        }
        self.scoring.validate()
    }
}

/// 一次成功比对：分数、覆盖区间与参考绝对坐标下的突变列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentHit {
    pub ref_id: u32,
    pub score: i32,
    /// 查询覆盖 [start, end)
    pub query_range: (usize, usize),
    /// 参考覆盖 [start, end)，绝对坐标
    pub ref_range: (usize, usize),
    /// 将参考覆盖段变换为查询覆盖段的突变（参考绝对坐标）
    pub mutations: Mutations,
    pub cigar: String,
}

/// 比对终态：命中或未命中。未命中不是错误。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlignOutcome {
    Hit(AlignmentHit),
    NoMatch,
}

impl AlignOutcome {
    pub fn hit(&self) -> Option<&AlignmentHit> {
        match self {
            AlignOutcome::Hit(h) => Some(h),
            AlignOutcome::NoMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, AlignOutcome::Hit(_))
    }
}

pub struct KAligner {
    params: KAlignerParams,
    staged: Vec<(String, Sequence)>,
    index: Option<Arc<KmerIndex>>,
}

impl KAligner {
    pub fn new(params: KAlignerParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            staged: Vec::new(),
            index: None,
        })
    }

    pub fn params(&self) -> &KAlignerParams {
        &self.params
    }

    /// 登记一条命名参考。索引建成后不再接受新参考。
    pub fn add_reference(&mut self, name: &str, sequence: Sequence) -> Result<()> {
        if self.index.is_some() {
            return Err(Error::InvalidConfig(
                "reference set is frozen once the index is built".to_string(),
            ));
        }
        if !sequence.alphabet().is_nucleotide() {
            return Err(Error::UnsupportedForAlphabet {
                operation: "add_reference",
                alphabet: sequence.alphabet().name(),
            });
        }
        self.staged.push((name.to_string(), sequence));
        Ok(())
    }

    /// 一次性构建 k-mer 索引；此后索引只读
    pub fn build_index(&mut self) -> Result<()> {
        let mut index = KmerIndex::build(std::mem::take(&mut self.staged), self.params.k)?;
        index.set_meta(IndexMeta {
            built_from: None,
            build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
        });
        self.index = Some(Arc::new(index));
        Ok(())
    }

    /// 共享只读索引（供流水线工作线程使用）
    pub fn index(&self) -> Result<Arc<KmerIndex>> {
        self.index.clone().ok_or(Error::IndexNotBuilt)
    }

    /// 对单条查询执行 种子 -> 延伸 -> 打分 -> 终态 流程。
    /// 相同输入与配置下输出逐位一致。
    pub fn align(&self, query: &Sequence) -> Result<AlignOutcome> {
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }
        let index = self.index.as_deref().ok_or(Error::IndexNotBuilt)?;
        if !query.alphabet().is_nucleotide() {
            return Err(Error::AlphabetMismatch {
                left: "nucleotide",
                right: query.alphabet().name(),
            });
        }

        let query_codes = query.to_codes();
        let alphabet = query.alphabet();
        let wildcard = alphabet.wildcard();

        // Seeding
        let seeds = collect_seeds(index, alphabet, &query_codes);
        if seeds.is_empty() {
            return Ok(AlignOutcome::NoMatch);
        }
        let clusters = cluster_seeds(&seeds, self.params.k, self.params.seed_diagonal_tolerance);
        debug!(
            "query len {}: {} seeds, {} clusters",
            query.len(),
            seeds.len(),
            clusters.len()
        );

        // Extending + Scoring
        let band = self.params.max_gap_width;
        let mut buf = ExtendBuffer::new();
        let mut best: Option<AlignmentHit> = None;
        for cluster in &clusters {
            let reference = match index.reference(cluster.ref_id) {
                Some(r) => r,
                None => continue,
            };
            let ref_len = reference.sequence.len();
            // 窗口 = 簇的参考覆盖，向两侧扩出未覆盖的查询侧翼加带宽
            let left_flank = cluster.q_min + band;
            let window_start = cluster.r_min.saturating_sub(left_flank);
            let right_flank = query_codes.len() - cluster.q_max + band;
            let window_end = (cluster.r_max + right_flank).min(ref_len);
            if window_start >= window_end {
                continue;
            }
            let window_codes = reference.sequence.sub(window_start, window_end)?.to_codes();

            // 种子匹配在窗口内的对角线偏移；DP 带宽须覆盖它加上允许的间隙
            let seed_offset =
                (cluster.r_min - window_start) as isize - cluster.q_min as isize;
            let ext = banded_extend_with_buf(
                &query_codes,
                &window_codes,
                &self.params.scoring,
                seed_offset.unsigned_abs() + band,
                wildcard,
                &mut buf,
            );
            if ext.score < self.params.min_score || ext.query_end == ext.query_start {
                continue;
            }

            let hit = AlignmentHit {
                ref_id: cluster.ref_id,
                score: ext.score,
                query_range: (ext.query_start, ext.query_end),
                ref_range: (window_start + ext.ref_start, window_start + ext.ref_end),
                mutations: ops_to_mutations(
                    alphabet,
                    &ext.ops,
                    &query_codes,
                    &window_codes,
                    ext.query_start,
                    ext.ref_start,
                    window_start,
                )?,
                cigar: ops_to_cigar(&ext.ops),
            };
            if better(&hit, best.as_ref()) {
                best = Some(hit);
            }
        }

        // Done | NoMatch
        match best {
            Some(hit) => Ok(AlignOutcome::Hit(hit)),
            None => Ok(AlignOutcome::NoMatch),
        }
    }
}

/// 命中排序：分数降序 -> 查询覆盖长度降序 -> ref_id 升序 -> 参考偏移升序
fn better(candidate: &AlignmentHit, incumbent: Option<&AlignmentHit>) -> bool {
    use std::cmp::Reverse;
    let inc = match incumbent {
        Some(h) => h,
        None => return true,
    };
    let key = |h: &AlignmentHit| {
        (
            Reverse(h.score),
            Reverse(h.query_range.1 - h.query_range.0),
            h.ref_id,
            h.ref_range.0,
        )
    };
    key(candidate) < key(inc)
}

/// 将延伸操作序列翻译为参考绝对坐标下的突变列表
fn ops_to_mutations(
    alphabet: Alphabet,
    ops: &[AlignOp],
    query_codes: &[u8],
    window_codes: &[u8],
    query_start: usize,
    ref_start: usize,
    window_offset: usize,
) -> Result<Mutations> {
    let mut records = Vec::new();
    let mut qi = query_start;
    let mut rj = ref_start;
    for &op in ops {
        match op {
            AlignOp::Match => {
                qi += 1;
                rj += 1;
            }
            AlignOp::Mismatch => {
                records.push(Mutation::Substitution {
                    pos: window_offset + rj,
                    from: window_codes[rj],
                    to: query_codes[qi],
                });
                qi += 1;
                rj += 1;
            }
            AlignOp::Insertion => {
                records.push(Mutation::Insertion {
                    pos: window_offset + rj,
                    to: query_codes[qi],
                });
                qi += 1;
            }
            AlignOp::Deletion => {
                records.push(Mutation::Deletion {
                    pos: window_offset + rj,
                    from: window_codes[rj],
                });
                rj += 1;
            }
        }
    }
    Mutations::from_records(alphabet, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seq::Alphabet;

    fn nuc(s: &[u8]) -> Sequence {
        Sequence::from_symbols(Alphabet::Nucleotide, s).unwrap()
    }

    fn test_params(k: usize, min_score: i32) -> KAlignerParams {
        KAlignerParams {
            k,
            seed_diagonal_tolerance: 4,
            max_gap_width: 8,
            min_score,
            scoring: AffineGapScoring::new(1, -1, -2, -1),
        }
    }

    fn aligner_for(reference: &[u8], k: usize, min_score: i32) -> KAligner {
        let mut aligner = KAligner::new(test_params(k, min_score)).unwrap();
        aligner.add_reference("ref", nuc(reference)).unwrap();
        aligner.build_index().unwrap();
        aligner
    }

    #[test]
    fn single_substitution_end_to_end() {
        let aligner = aligner_for(b"ACGTACGTACGT", 4, 5);
        let outcome = aligner.align(&nuc(b"ACGTACGAACGT")).unwrap();
        let hit = outcome.hit().expect("expected a hit");
        assert_eq!(hit.ref_id, 0);
        assert_eq!(hit.score, 10); // 11 匹配 - 1 错配
        assert_eq!(hit.query_range, (0, 12));
        assert_eq!(hit.ref_range, (0, 12));
        assert_eq!(hit.mutations.len(), 1);
        assert!(matches!(
            hit.mutations.records()[0],
            Mutation::Substitution { pos: 7, from: 3, to: 0 } // T -> A
        ));
        assert_eq!(hit.cigar, "12M");
    }

    #[test]
    fn hit_mutations_reconstruct_query_segment() {
        let aligner = aligner_for(b"TTTTACGTACGTACGTTTTT", 4, 5);
        let query = nuc(b"ACGTACGAACGT");
        let hit = aligner.align(&query).unwrap().hit().unwrap().clone();
        let index = aligner.index().unwrap();
        let reference = &index.references()[0].sequence;
        let covered = reference.sub(hit.ref_range.0, hit.ref_range.1).unwrap();
        // 突变移回覆盖段局部坐标后应用于参考覆盖段，应重建查询覆盖段
        let local_records: Vec<Mutation> = hit
            .mutations
            .records()
            .iter()
            .map(|r| match *r {
                Mutation::Substitution { pos, from, to } => Mutation::Substitution {
                    pos: pos - hit.ref_range.0,
                    from,
                    to,
                },
                Mutation::Insertion { pos, to } => Mutation::Insertion {
                    pos: pos - hit.ref_range.0,
                    to,
                },
                Mutation::Deletion { pos, from } => Mutation::Deletion {
                    pos: pos - hit.ref_range.0,
                    from,
                },
            })
            .collect();
        let local = Mutations::from_records(Alphabet::Nucleotide, local_records).unwrap();
        let rebuilt = local.apply(&covered).unwrap();
        let expected = query.sub(hit.query_range.0, hit.query_range.1).unwrap();
        assert_eq!(rebuilt, expected);
    }

    #[test]
    fn no_shared_kmer_returns_no_match() {
        let aligner = aligner_for(b"ACGTACGTACGT", 4, 5);
        let outcome = aligner.align(&nuc(b"CCCCCCCCCCCC")).unwrap();
        assert_eq!(outcome, AlignOutcome::NoMatch);
    }

    #[test]
    fn below_threshold_returns_no_match() {
        let aligner = aligner_for(b"ACGTACGTACGT", 4, 100);
        let outcome = aligner.align(&nuc(b"ACGTACGTACGT")).unwrap();
        assert_eq!(outcome, AlignOutcome::NoMatch);
    }

    #[test]
    fn empty_query_is_an_error_not_no_match() {
        let aligner = aligner_for(b"ACGTACGTACGT", 4, 5);
        let empty = Sequence::from_symbols(Alphabet::Nucleotide, b"").unwrap();
        assert!(matches!(aligner.align(&empty), Err(Error::EmptyQuery)));
    }

    #[test]
    fn align_before_build_fails() {
        let mut aligner = KAligner::new(test_params(4, 5)).unwrap();
        aligner.add_reference("ref", nuc(b"ACGTACGTACGT")).unwrap();
        assert!(matches!(
            aligner.align(&nuc(b"ACGT")),
            Err(Error::IndexNotBuilt)
        ));
        // 空查询优先于索引检查
        let empty = Sequence::from_symbols(Alphabet::Nucleotide, b"").unwrap();
        assert!(matches!(aligner.align(&empty), Err(Error::EmptyQuery)));
    }

    #[test]
    fn add_reference_after_build_fails() {
        let mut aligner = KAligner::new(test_params(4, 5)).unwrap();
        aligner.add_reference("ref", nuc(b"ACGTACGTACGT")).unwrap();
        aligner.build_index().unwrap();
        assert!(aligner.add_reference("late", nuc(b"ACGT")).is_err());
    }

    #[test]
    fn deterministic_across_runs() {
        let reference = b"ACGTTGCAACGTAGCTAGCTAACGTTGCA";
        let query = nuc(b"ACGTAGCTTAGCTAACG");
        let a1 = aligner_for(reference, 4, 5);
        let a2 = aligner_for(reference, 4, 5);
        let o1 = a1.align(&query).unwrap();
        let o2 = a2.align(&query).unwrap();
        assert_eq!(o1, o2);
        // 同一实例重复比对也一致
        assert_eq!(a1.align(&query).unwrap(), o1);
    }

    #[test]
    fn best_reference_wins_with_deterministic_tie_break() {
        let mut aligner = KAligner::new(test_params(4, 5)).unwrap();
        aligner
            .add_reference("near", nuc(b"ACGTACGAACGT"))
            .unwrap();
        aligner
            .add_reference("exact", nuc(b"ACGTACGTACGT"))
            .unwrap();
        aligner.build_index().unwrap();
        let hit = aligner
            .align(&nuc(b"ACGTACGTACGT"))
            .unwrap()
            .hit()
            .unwrap()
            .clone();
        // 完全匹配（12 分）胜过一处错配（10 分）
        assert_eq!(hit.ref_id, 1);
        assert_eq!(hit.score, 12);
        assert!(hit.mutations.is_empty());
    }

    #[test]
    fn insertion_in_query_is_reported() {
        // 参考不含 G；查询在中间多出一个 G
        let aligner = aligner_for(b"AACCTTAACCTTAACC", 4, 5);
        let hit = aligner
            .align(&nuc(b"AACCTTAAGCCTTAACC"))
            .unwrap()
            .hit()
            .unwrap()
            .clone();
        assert_eq!(hit.score, 16 - 3);
        let ins: Vec<_> = hit
            .mutations
            .records()
            .iter()
            .filter(|r| matches!(r, Mutation::Insertion { .. }))
            .collect();
        assert_eq!(ins.len(), 1);
    }

    #[test]
    fn invalid_params_are_fatal() {
        let mut p = test_params(4, 5);
        p.k = 0;
        assert!(KAligner::new(p).is_err());
        let mut p = test_params(4, 5);
        p.scoring.mismatch_penalty = 1;
        assert!(KAligner::new(p).is_err());
    }
}
