//! 带状仿射间隙局部延伸。
//!
//! 在参考窗口内对查询做带状 Smith-Waterman（仿射间隙），
//! 输出编辑操作序列而非文本 CIGAR；分数由打分器对操作序列
//! 重新累计，保证分数与操作严格一致。
//! 使用可复用的缓冲区以减少内存分配。

use super::scoring::AffineGapScoring;

const NEG_INF: i32 = i32::MIN / 4;

/// 比对操作，按查询/参考消耗区分：
/// Insertion 消耗查询符号，Deletion 消耗参考符号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignOp {
    Match,
    Mismatch,
    Insertion,
    Deletion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendResult {
    pub score: i32,
    /// 查询覆盖 [query_start, query_end)
    pub query_start: usize,
    pub query_end: usize,
    /// 窗口内参考覆盖 [ref_start, ref_end)
    pub ref_start: usize,
    pub ref_end: usize,
    pub ops: Vec<AlignOp>,
}

impl ExtendResult {
    fn empty() -> Self {
        Self {
            score: 0,
            query_start: 0,
            query_end: 0,
            ref_start: 0,
            ref_end: 0,
            ops: Vec::new(),
        }
    }
}

/// DP 工作缓冲区，可跨调用复用
pub struct ExtendBuffer {
    h: Vec<i32>,
    e: Vec<i32>,
    f: Vec<i32>,
}

impl ExtendBuffer {
    pub fn new() -> Self {
        Self {
            h: Vec::new(),
            e: Vec::new(),
            f: Vec::new(),
        }
    }

    fn resize(&mut self, size: usize) {
        self.h.resize(size, 0);
        self.e.resize(size, NEG_INF);
        self.f.resize(size, NEG_INF);
        self.h.iter_mut().for_each(|v| *v = 0);
        self.e.iter_mut().for_each(|v| *v = NEG_INF);
        self.f.iter_mut().for_each(|v| *v = NEG_INF);
    }
}

impl Default for ExtendBuffer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn banded_extend(
    query: &[u8],
    window: &[u8],
    scoring: &AffineGapScoring,
    band: usize,
    wildcard: u8,
) -> ExtendResult {
    banded_extend_with_buf(query, window, scoring, band, wildcard, &mut ExtendBuffer::new())
}

pub fn banded_extend_with_buf(
    query: &[u8],
    window: &[u8],
    scoring: &AffineGapScoring,
    band: usize,
    wildcard: u8,
    buf: &mut ExtendBuffer,
) -> ExtendResult {
    let m = query.len();
    let n = window.len();
    if m == 0 || n == 0 {
        return ExtendResult::empty();
    }

    let cols = n + 1;
    buf.resize((m + 1) * cols);
    let h = &mut buf.h;
    let e = &mut buf.e;
    let f = &mut buf.f;

    let open_ext = scoring.gap_open_penalty + scoring.gap_extend_penalty;
    let ext = scoring.gap_extend_penalty;
    let band = band as isize;

    let mut best_score = 0i32;
    let mut best_i = 0usize;
    let mut best_j = 0usize;

    for i in 1..=m {
        let i_isize = i as isize;
        let mut j_start = 1usize;
        let mut j_end = n;
        let js = i_isize - band;
        let je = i_isize + band;
        if js > 1 {
            j_start = js as usize;
        }
        if je < n as isize {
            j_end = je as usize;
        }
        if j_start > j_end {
            continue;
        }

        for j in j_start..=j_end {
            let idx = i * cols + j;
            let up = (i - 1) * cols + j;
            let left = i * cols + (j - 1);
            let diag = (i - 1) * cols + (j - 1);

            e[idx] = (h[up] + open_ext).max(e[up] + ext);
            f[idx] = (h[left] + open_ext).max(f[left] + ext);

            let pair = scoring.score_pair(wildcard, query[i - 1], window[j - 1]);
            let mut val = h[diag] + pair;
            if e[idx] > val {
                val = e[idx];
            }
            if f[idx] > val {
                val = f[idx];
            }
            if val < 0 {
                val = 0;
            }
            h[idx] = val;

            if val > best_score {
                best_score = val;
                best_i = i;
                best_j = j;
            }
        }
    }

    if best_score <= 0 {
        return ExtendResult::empty();
    }

    // 回溯：在 H/E/F 三个状态之间显式转移，保证路径与 DP 分数一致
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        H,
        E,
        F,
    }

    let mut rev_ops: Vec<AlignOp> = Vec::new();
    let mut i = best_i;
    let mut j = best_j;
    let mut state = State::H;

    while i > 0 && j > 0 {
        let idx = i * cols + j;
        match state {
            State::H => {
                if h[idx] == 0 {
                    break;
                }
                let diag = (i - 1) * cols + (j - 1);
                let pair = scoring.score_pair(wildcard, query[i - 1], window[j - 1]);
                if h[idx] == h[diag] + pair {
                    rev_ops.push(if query[i - 1] == window[j - 1] && query[i - 1] != wildcard {
                        AlignOp::Match
                    } else {
                        AlignOp::Mismatch
                    });
                    i -= 1;
                    j -= 1;
                } else if h[idx] == e[idx] {
                    state = State::E;
                } else {
                    state = State::F;
                }
            }
            State::E => {
                // 优先延续间隙，保证间隙极大化且与 DP 分数一致
                let up = (i - 1) * cols + j;
                rev_ops.push(AlignOp::Insertion);
                if e[i * cols + j] != e[up] + ext {
                    state = State::H;
                }
                i -= 1;
            }
            State::F => {
                let left = i * cols + (j - 1);
                rev_ops.push(AlignOp::Deletion);
                if f[i * cols + j] != f[left] + ext {
                    state = State::H;
                }
                j -= 1;
            }
        }
    }

    rev_ops.reverse();
    let ops = rev_ops;

    let result = ExtendResult {
        score: rescore(&ops, &query[i..best_i], &window[j..best_j], scoring, wildcard),
        query_start: i,
        query_end: best_i,
        ref_start: j,
        ref_end: best_j,
        ops,
    };
    debug_assert_eq!(result.score, best_score);
    result
}

/// 按操作序列重新累计仿射分数
fn rescore(
    ops: &[AlignOp],
    query: &[u8],
    window: &[u8],
    scoring: &AffineGapScoring,
    wildcard: u8,
) -> i32 {
    let mut score = 0i32;
    let mut qi = 0usize;
    let mut rj = 0usize;
    let mut idx = 0usize;
    while idx < ops.len() {
        match ops[idx] {
            AlignOp::Match | AlignOp::Mismatch => {
                score += scoring.score_pair(wildcard, query[qi], window[rj]);
                qi += 1;
                rj += 1;
                idx += 1;
            }
            AlignOp::Insertion => {
                let mut len = 0usize;
                while idx < ops.len() && ops[idx] == AlignOp::Insertion {
                    len += 1;
                    qi += 1;
                    idx += 1;
                }
                score += scoring.gap_penalty(len);
            }
            AlignOp::Deletion => {
                let mut len = 0usize;
                while idx < ops.len() && ops[idx] == AlignOp::Deletion {
                    len += 1;
                    rj += 1;
                    idx += 1;
                }
                score += scoring.gap_penalty(len);
            }
        }
    }
    score
}

/// 渲染为文本 CIGAR（匹配与错配都记 M）
pub fn ops_to_cigar(ops: &[AlignOp]) -> String {
    use std::fmt::Write as _;
    let mut cigar = String::new();
    let mut iter = ops.iter().map(|op| match op {
        AlignOp::Match | AlignOp::Mismatch => 'M',
        AlignOp::Insertion => 'I',
        AlignOp::Deletion => 'D',
    });
    let mut cur = match iter.next() {
        Some(c) => c,
        None => return cigar,
    };
    let mut len = 1usize;
    for ch in iter {
        if ch == cur {
            len += 1;
        } else {
            let _ = write!(&mut cigar, "{}{}", len, cur);
            cur = ch;
            len = 1;
        }
    }
    let _ = write!(&mut cigar, "{}{}", len, cur);
    cigar
}
