//! # seqlib-rust
//!
//! 面向 NGS 数据处理的 Rust 序列处理库。
//!
//! 本 crate 提供紧凑的生物序列表示与近似比对基础设施，包括：
//!
//! - **序列表示**：按字母表最小位宽打包的不可变序列（核苷酸/氨基酸）
//! - **突变编码**：两条序列间编辑操作（替换/插入/缺失）的有序编码
//! - **k-mer 索引**：参考集合上的种子索引，一次构建、只读共享
//! - **种子延伸比对**：带状仿射间隙局部比对，输出突变与分数
//! - **流水线**：有界、保序的并行读段处理框架
//!
//! ## 快速示例
//!
//! ```rust
//! use seqlib_rust::align::{KAligner, KAlignerParams};
//! use seqlib_rust::align::scoring::AffineGapScoring;
//! use seqlib_rust::seq::{Alphabet, Sequence};
//!
//! let mut params = KAlignerParams::default();
//! params.k = 4;
//! params.min_score = 5;
//! params.scoring = AffineGapScoring::new(1, -1, -2, -1);
//!
//! let mut aligner = KAligner::new(params).unwrap();
//! let reference = Sequence::from_symbols(Alphabet::Nucleotide, b"ACGTACGTACGT").unwrap();
//! aligner.add_reference("ref1", reference).unwrap();
//! aligner.build_index().unwrap();
//!
//! let query = Sequence::from_symbols(Alphabet::Nucleotide, b"ACGTACGAACGT").unwrap();
//! let outcome = aligner.align(&query).unwrap();
//! let hit = outcome.hit().expect("one substitution away from the reference");
//! assert_eq!(hit.mutations.len(), 1);
//! ```
//!
//! ## 模块说明
//!
//! - [`seq`] — 字母表、位打包序列、质量分数
//! - [`mutation`] — 序列间编辑编码（diff / apply / invert）
//! - [`index`] — k-mer 索引构建与持久化
//! - [`align`] — 种子延伸比对器与仿射间隙打分
//! - [`pipeline`] — 有界保序并行流水线
//! - [`io`] — FASTA / FASTQ 记录解析、压缩块编解码
//! - [`util`] — ASCII 级 DNA 工具函数

pub mod align;
pub mod error;
pub mod index;
pub mod io;
pub mod mutation;
pub mod pipeline;
pub mod seq;
pub mod util;

pub use error::{Error, Result};
