//! 种子查找：查询序列按不重叠 k-mer 切分，逐个查索引。

use crate::index::kmer::{pack_kmer, KmerIndex};
use crate::seq::Alphabet;

/// k-mer 种子：查询偏移 qpos 与参考偏移 rpos 的一段精确匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed {
    pub ref_id: u32,
    pub qpos: u32,
    pub rpos: u32,
}

impl Seed {
    /// 对角线：参考偏移减查询偏移。同一无间隙匹配上的种子对角线相同。
    #[inline]
    pub fn diagonal(&self) -> i64 {
        self.rpos as i64 - self.qpos as i64
    }
}

/// 将查询切分为不重叠 k-mer（偏移 0, k, 2k, ...），收集全部候选种子。
/// 返回按 (ref_id, 对角线, qpos) 排序去重的列表，保证下游确定性。
pub fn collect_seeds(index: &KmerIndex, alphabet: Alphabet, query_codes: &[u8]) -> Vec<Seed> {
    let k = index.k();
    let mut seeds = Vec::new();
    let mut qpos = 0usize;
    while qpos + k <= query_codes.len() {
        if let Some(key) = pack_kmer(alphabet, &query_codes[qpos..qpos + k]) {
            for &(ref_id, rpos) in index.lookup(key) {
                seeds.push(Seed {
                    ref_id,
                    qpos: qpos as u32,
                    rpos,
                });
            }
        }
        qpos += k;
    }
    seeds.sort_unstable_by(|a, b| {
        a.ref_id
            .cmp(&b.ref_id)
            .then(a.diagonal().cmp(&b.diagonal()))
            .then(a.qpos.cmp(&b.qpos))
    });
    seeds.dedup();
    seeds
}
