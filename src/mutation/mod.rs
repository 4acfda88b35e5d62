//! 两条序列之间的编辑（突变）编码。
//!
//! 突变记录以原始序列坐标表达，按位置有序；替换/缺失记录同时携带
//! 原符号编码（from），因此 `invert` 不需要访问原始序列，`apply`
//! 能检测坐标漂移。
//!
//! 排序不变式：位置非递减；消耗原始符号的记录（替换/缺失）位置严格
//! 递增；同一位置上的插入串按从左到右顺序排列，且先于该位置的消耗
//! 记录。

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::seq::{Alphabet, Sequence};

/// 带状 diff 在 |len(a)-len(b)| 之外追加的带宽余量
const DIFF_BAND_MARGIN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// 将原始位置 pos 上的 from 替换为 to
    Substitution { pos: usize, from: u8, to: u8 },
    /// 在原始位置 pos 之前插入 to
    Insertion { pos: usize, to: u8 },
    /// 删除原始位置 pos 上的 from
    Deletion { pos: usize, from: u8 },
}

impl Mutation {
    #[inline]
    pub fn pos(&self) -> usize {
        match *self {
            Mutation::Substitution { pos, .. }
            | Mutation::Insertion { pos, .. }
            | Mutation::Deletion { pos, .. } => pos,
        }
    }

    /// 是否消耗一个原始符号
    #[inline]
    fn consumes(&self) -> bool {
        !matches!(self, Mutation::Insertion { .. })
    }

    /// 平移到绝对坐标（如参考序列内的偏移）
    pub fn shift(&self, offset: usize) -> Mutation {
        match *self {
            Mutation::Substitution { pos, from, to } => Mutation::Substitution {
                pos: pos + offset,
                from,
                to,
            },
            Mutation::Insertion { pos, to } => Mutation::Insertion {
                pos: pos + offset,
                to,
            },
            Mutation::Deletion { pos, from } => Mutation::Deletion {
                pos: pos + offset,
                from,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutations {
    alphabet: Alphabet,
    records: Vec<Mutation>,
}

impl Mutations {
    /// 从记录列表构造，校验排序不变式
    pub fn from_records(alphabet: Alphabet, records: Vec<Mutation>) -> Result<Self> {
        validate_order(&records)?;
        Ok(Self { alphabet, records })
    }

    pub fn empty(alphabet: Alphabet) -> Self {
        Self {
            alphabet,
            records: Vec::new(),
        }
    }

    #[inline]
    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    #[inline]
    pub fn records(&self) -> &[Mutation] {
        &self.records
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 应用后序列长度
    pub fn mutated_length(&self, original_len: usize) -> usize {
        let mut len = original_len as isize;
        for r in &self.records {
            match r {
                Mutation::Insertion { .. } => len += 1,
                Mutation::Deletion { .. } => len -= 1,
                Mutation::Substitution { .. } => {}
            }
        }
        len as usize
    }

    /// 整体平移到绝对坐标
    pub fn shift(&self, offset: usize) -> Mutations {
        Mutations {
            alphabet: self.alphabet,
            records: self.records.iter().map(|r| r.shift(offset)).collect(),
        }
    }

    /// 带状最小编辑距离 diff：单位代价，带宽 |len(a)-len(b)| + 余量。
    /// 回溯优先级固定（替换 > 缺失 > 插入），输出确定可复现。
    pub fn diff(a: &Sequence, b: &Sequence) -> Result<Mutations> {
        if a.alphabet() != b.alphabet() {
            return Err(Error::AlphabetMismatch {
                left: a.alphabet().name(),
                right: b.alphabet().name(),
            });
        }
        let ca = a.to_codes();
        let cb = b.to_codes();
        let n = ca.len();
        let m = cb.len();
        let band = n.abs_diff(m) + DIFF_BAND_MARGIN;

        let cols = m + 1;
        const INF: u32 = u32::MAX / 2;
        let mut dp = vec![INF; (n + 1) * cols];

        dp[0] = 0;
        for j in 1..=m.min(band) {
            dp[j] = j as u32;
        }
        for i in 1..=n {
            let j_lo = i.saturating_sub(band);
            let j_hi = (i + band).min(m);
            if j_lo == 0 {
                dp[i * cols] = i as u32;
            }
            for j in j_lo.max(1)..=j_hi {
                let idx = i * cols + j;
                let sub_cost = if ca[i - 1] == cb[j - 1] { 0 } else { 1 };
                let mut best = dp[(i - 1) * cols + (j - 1)].saturating_add(sub_cost);
                let del = dp[(i - 1) * cols + j].saturating_add(1);
                if del < best {
                    best = del;
                }
                let ins = dp[i * cols + (j - 1)].saturating_add(1);
                if ins < best {
                    best = ins;
                }
                dp[idx] = best;
            }
        }

        // 回溯：对角优先（匹配/替换），其次缺失（上），最后插入（左）
        let mut rev: Vec<Mutation> = Vec::new();
        let mut i = n;
        let mut j = m;
        while i > 0 || j > 0 {
            let here = dp[i * cols + j];
            if i > 0 && j > 0 {
                let sub_cost = if ca[i - 1] == cb[j - 1] { 0 } else { 1 };
                if dp[(i - 1) * cols + (j - 1)].saturating_add(sub_cost) == here {
                    if sub_cost == 1 {
                        rev.push(Mutation::Substitution {
                            pos: i - 1,
                            from: ca[i - 1],
                            to: cb[j - 1],
                        });
                    }
                    i -= 1;
                    j -= 1;
                    continue;
                }
            }
            if i > 0 && dp[(i - 1) * cols + j].saturating_add(1) == here {
                rev.push(Mutation::Deletion {
                    pos: i - 1,
                    from: ca[i - 1],
                });
                i -= 1;
                continue;
            }
            debug_assert!(j > 0);
            rev.push(Mutation::Insertion {
                pos: i,
                to: cb[j - 1],
            });
            j -= 1;
        }

        rev.reverse();
        Ok(Mutations {
            alphabet: a.alphabet(),
            records: rev,
        })
    }

    /// 按顺序消耗原始序列并应用突变，产生新序列。
    /// 坐标越界或 from 编码与原始序列不符时返回 `CoordinateMismatch`。
    pub fn apply(&self, a: &Sequence) -> Result<Sequence> {
        if a.alphabet() != self.alphabet {
            return Err(Error::AlphabetMismatch {
                left: self.alphabet.name(),
                right: a.alphabet().name(),
            });
        }
        let ca = a.to_codes();
        let mut out: Vec<u8> = Vec::with_capacity(self.mutated_length(ca.len()));
        let mut cursor = 0usize;

        for r in &self.records {
            let pos = r.pos();
            if pos < cursor || pos > ca.len() || (r.consumes() && pos == ca.len()) {
                return Err(Error::CoordinateMismatch(format!(
                    "mutation at position {} cannot be applied at cursor {}",
                    pos, cursor
                )));
            }
            out.extend_from_slice(&ca[cursor..pos]);
            cursor = pos;
            match *r {
                Mutation::Substitution { from, to, .. } => {
                    if ca[pos] != from {
                        return Err(Error::CoordinateMismatch(format!(
                            "substitution at {} expects code {} but sequence has {}",
                            pos, from, ca[pos]
                        )));
                    }
                    out.push(to);
                    cursor += 1;
                }
                Mutation::Insertion { to, .. } => out.push(to),
                Mutation::Deletion { from, .. } => {
                    if ca[pos] != from {
                        return Err(Error::CoordinateMismatch(format!(
                            "deletion at {} expects code {} but sequence has {}",
                            pos, from, ca[pos]
                        )));
                    }
                    cursor += 1;
                }
            }
        }
        out.extend_from_slice(&ca[cursor..]);
        Sequence::from_codes(self.alphabet, &out)
    }

    /// 反向映射：突变后坐标 -> 原始坐标。`invert(invert(m)) == m`。
    pub fn invert(&self) -> Mutations {
        let mut delta = 0isize;
        let records = self
            .records
            .iter()
            .map(|r| {
                let pos = (r.pos() as isize + delta) as usize;
                match *r {
                    Mutation::Substitution { from, to, .. } => {
                        Mutation::Substitution { pos, from: to, to: from }
                    }
                    Mutation::Insertion { to, .. } => {
                        delta += 1;
                        Mutation::Deletion { pos, from: to }
                    }
                    Mutation::Deletion { from, .. } => {
                        delta -= 1;
                        Mutation::Insertion { pos, to: from }
                    }
                }
            })
            .collect();
        Mutations {
            alphabet: self.alphabet,
            records,
        }
    }

    /// 仅支持坐标区间不相交的组合：按位置顺序拼接。
    /// 区间重叠返回 `CoordinateMismatch`（一般组合是非目标）。
    pub fn compose_disjoint(m1: &Mutations, m2: &Mutations) -> Result<Mutations> {
        if m1.alphabet != m2.alphabet {
            return Err(Error::AlphabetMismatch {
                left: m1.alphabet.name(),
                right: m2.alphabet.name(),
            });
        }
        if m1.is_empty() || m2.is_empty() {
            let mut records = m1.records.clone();
            records.extend_from_slice(&m2.records);
            return Ok(Mutations {
                alphabet: m1.alphabet,
                records,
            });
        }
        let (first, second) = if m1.records.last().unwrap().pos() < m2.records[0].pos() {
            (m1, m2)
        } else if m2.records.last().unwrap().pos() < m1.records[0].pos() {
            (m2, m1)
        } else {
            return Err(Error::CoordinateMismatch(
                "mutation lists overlap; composition is only defined for disjoint ranges"
                    .to_string(),
            ));
        };
        let mut records = first.records.clone();
        records.extend_from_slice(&second.records);
        Ok(Mutations {
            alphabet: m1.alphabet,
            records,
        })
    }
}

/// 排序不变式检查：位置非递减，消耗记录严格递增，
/// 消耗记录之后同一位置不得再出现插入。
fn validate_order(records: &[Mutation]) -> Result<()> {
    let mut last_pos = 0usize;
    let mut last_consumed: Option<usize> = None;
    for r in records {
        let pos = r.pos();
        if pos < last_pos {
            return Err(Error::CoordinateMismatch(format!(
                "mutation positions must be non-decreasing, got {} after {}",
                pos, last_pos
            )));
        }
        if let Some(c) = last_consumed {
            if pos <= c {
                return Err(Error::CoordinateMismatch(format!(
                    "position {} already consumed",
                    pos
                )));
            }
        }
        if r.consumes() {
            last_consumed = Some(pos);
        }
        last_pos = pos;
    }
    Ok(())
}

impl std::fmt::Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 紧凑文本形式，符号以编码数字渲染：S7:3>0 / I8:2 / D5:1
        match *self {
            Mutation::Substitution { pos, from, to } => write!(f, "S{}:{}>{}", pos, from, to),
            Mutation::Insertion { pos, to } => write!(f, "I{}:{}", pos, to),
            Mutation::Deletion { pos, from } => write!(f, "D{}:{}", pos, from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nuc(s: &[u8]) -> Sequence {
        Sequence::from_symbols(Alphabet::Nucleotide, s).unwrap()
    }

    /// 确定性伪随机序列（与 bench 相同的 LCG）
    fn random_seq(len: usize, seed: u32) -> Sequence {
        let mut x = seed;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            out.push(b"ACGT"[(x >> 16) as usize % 4]);
        }
        nuc(&out)
    }

    #[test]
    fn diff_identical_is_empty() {
        let a = nuc(b"ACGTACGT");
        let m = Mutations::diff(&a, &a).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.apply(&a).unwrap(), a);
    }

    #[test]
    fn diff_prefers_substitution_over_indel_pair() {
        let a = nuc(b"ACGTACGT");
        let b = nuc(b"ACGAACGT");
        let m = Mutations::diff(&a, &b).unwrap();
        assert_eq!(m.len(), 1);
        assert!(matches!(
            m.records()[0],
            Mutation::Substitution { pos: 3, from: 3, to: 0 }
        ));
    }

    #[test]
    fn diff_handles_insertion_and_deletion() {
        let a = nuc(b"ACGT");
        let b = nuc(b"ACGGT");
        let m = Mutations::diff(&a, &b).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m.apply(&a).unwrap(), b);

        let m2 = Mutations::diff(&b, &a).unwrap();
        assert_eq!(m2.len(), 1);
        assert_eq!(m2.apply(&b).unwrap(), a);
    }

    #[test]
    fn diff_apply_roundtrip_on_random_pairs() {
        for seed in 1..20u32 {
            let a = random_seq(40 + (seed as usize % 17), seed);
            let b = random_seq(40 + ((seed as usize * 7) % 23), seed.wrapping_mul(31));
            let m = Mutations::diff(&a, &b).unwrap();
            assert_eq!(m.apply(&a).unwrap(), b, "seed={}", seed);
        }
    }

    #[test]
    fn diff_rejects_alphabet_mismatch() {
        let a = nuc(b"ACGT");
        let p = Sequence::from_symbols(Alphabet::AminoAcid, b"MKV").unwrap();
        assert!(matches!(
            Mutations::diff(&a, &p),
            Err(Error::AlphabetMismatch { .. })
        ));
    }

    #[test]
    fn apply_detects_coordinate_drift() {
        let a = nuc(b"ACGT");
        let b = nuc(b"AGGT");
        let m = Mutations::diff(&a, &b).unwrap();
        // 将突变应用到另一条序列：from 编码不符
        let other = nuc(b"TTTT");
        assert!(matches!(
            m.apply(&other),
            Err(Error::CoordinateMismatch(_))
        ));
    }

    #[test]
    fn apply_rejects_out_of_bounds() {
        let m = Mutations::from_records(
            Alphabet::Nucleotide,
            vec![Mutation::Substitution { pos: 10, from: 0, to: 1 }],
        )
        .unwrap();
        assert!(matches!(
            m.apply(&nuc(b"ACGT")),
            Err(Error::CoordinateMismatch(_))
        ));
    }

    #[test]
    fn invert_is_involution() {
        for seed in 1..10u32 {
            let a = random_seq(30, seed);
            let b = random_seq(34, seed.wrapping_add(99));
            let m = Mutations::diff(&a, &b).unwrap();
            assert_eq!(m.invert().invert(), m);
            // invert 将 b 映射回 a
            assert_eq!(m.invert().apply(&b).unwrap(), a);
        }
    }

    #[test]
    fn mutated_length_tracks_indels() {
        let a = nuc(b"ACGT");
        let b = nuc(b"ACGGTT");
        let m = Mutations::diff(&a, &b).unwrap();
        assert_eq!(m.mutated_length(a.len()), b.len());
    }

    #[test]
    fn compose_disjoint_concatenates_in_order() {
        let m1 = Mutations::from_records(
            Alphabet::Nucleotide,
            vec![Mutation::Substitution { pos: 1, from: 0, to: 1 }],
        )
        .unwrap();
        let m2 = Mutations::from_records(
            Alphabet::Nucleotide,
            vec![Mutation::Deletion { pos: 5, from: 2 }],
        )
        .unwrap();
        // 顺序无关，输出按位置排列
        let c1 = Mutations::compose_disjoint(&m1, &m2).unwrap();
        let c2 = Mutations::compose_disjoint(&m2, &m1).unwrap();
        assert_eq!(c1, c2);
        assert_eq!(c1.records()[0].pos(), 1);
        assert_eq!(c1.records()[1].pos(), 5);
    }

    #[test]
    fn compose_rejects_overlap() {
        let m1 = Mutations::from_records(
            Alphabet::Nucleotide,
            vec![
                Mutation::Substitution { pos: 1, from: 0, to: 1 },
                Mutation::Substitution { pos: 6, from: 0, to: 1 },
            ],
        )
        .unwrap();
        let m2 = Mutations::from_records(
            Alphabet::Nucleotide,
            vec![Mutation::Deletion { pos: 3, from: 2 }],
        )
        .unwrap();
        assert!(matches!(
            Mutations::compose_disjoint(&m1, &m2),
            Err(Error::CoordinateMismatch(_))
        ));
    }

    #[test]
    fn from_records_validates_ordering() {
        // 位置递减
        assert!(Mutations::from_records(
            Alphabet::Nucleotide,
            vec![
                Mutation::Deletion { pos: 5, from: 0 },
                Mutation::Substitution { pos: 2, from: 0, to: 1 },
            ],
        )
        .is_err());
        // 同一位置先消耗后插入
        assert!(Mutations::from_records(
            Alphabet::Nucleotide,
            vec![
                Mutation::Substitution { pos: 2, from: 0, to: 1 },
                Mutation::Insertion { pos: 2, to: 3 },
            ],
        )
        .is_err());
        // 同一位置插入串后接消耗记录：合法
        assert!(Mutations::from_records(
            Alphabet::Nucleotide,
            vec![
                Mutation::Insertion { pos: 2, to: 3 },
                Mutation::Insertion { pos: 2, to: 3 },
                Mutation::Substitution { pos: 2, from: 0, to: 1 },
            ],
        )
        .is_ok());
    }
}
