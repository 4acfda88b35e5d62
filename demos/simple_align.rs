//! 演示如何在 library 模式下使用 seqlib-rust 处理读段。
//!
//! 运行方式：
//! ```bash
//! cargo run --example simple_align
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use seqlib_rust::align::scoring::AffineGapScoring;
use seqlib_rust::align::{AlignOutcome, KAligner, KAlignerParams};
use seqlib_rust::mutation::Mutations;
use seqlib_rust::pipeline::{run_ordered, CancelToken, PipelineConfig};
use seqlib_rust::seq::{Alphabet, Sequence};

fn main() -> Result<()> {
    env_logger::init();

    // 1. 构建参考序列与比对器
    let reference = b"ACGTACGTAGCTGATCGTAGCTAGCTAGCTGATCGTAGCTAGCTAGCTGAT";
    println!("参考序列: {}", std::str::from_utf8(reference).unwrap());
    println!("参考长度: {} bp", reference.len());

    let params = KAlignerParams {
        k: 6,
        seed_diagonal_tolerance: 4,
        max_gap_width: 8,
        min_score: 8,
        scoring: AffineGapScoring::new(1, -1, -2, -1),
    };
    let mut aligner = KAligner::new(params)?;
    aligner.add_reference(
        "ref1",
        Sequence::from_symbols(Alphabet::Nucleotide, reference)?,
    )?;
    aligner.build_index()?;
    println!("k-mer 索引构建完成");

    // 2. 单条查询：一处错配
    let query = Sequence::from_symbols(Alphabet::Nucleotide, b"AGCTGATCGTAGCTAGCTAGATGAT")?;
    match aligner.align(&query)? {
        AlignOutcome::Hit(hit) => {
            println!("\n命中 ref_id={}", hit.ref_id);
            println!("  分数:   {}", hit.score);
            println!("  CIGAR:  {}", hit.cigar);
            println!("  查询区间: [{}, {})", hit.query_range.0, hit.query_range.1);
            println!("  参考区间: [{}, {})", hit.ref_range.0, hit.ref_range.1);
            for m in hit.mutations.records() {
                println!("  突变: {}", m);
            }
        }
        AlignOutcome::NoMatch => println!("\n未命中"),
    }

    // 3. 反向互补链上的读段：先反向互补回正链再比对
    let rev_read = seqlib_rust::util::dna::revcomp(&reference[20..44]);
    let rev_seq = Sequence::from_symbols(Alphabet::Nucleotide, &rev_read)?;
    let outcome = aligner.align(&rev_seq.reverse_complement()?)?;
    println!(
        "\n反向链读段比对: {}",
        if outcome.is_match() { "命中" } else { "未命中" }
    );

    // 4. diff / apply 往返
    let a = Sequence::from_symbols(Alphabet::Nucleotide, b"ACGTACGT")?;
    let b = Sequence::from_symbols(Alphabet::Nucleotide, b"ACGAACGGT")?;
    let m = Mutations::diff(&a, &b)?;
    println!("\ndiff 记录 {} 条，应用后还原: {}", m.len(), m.apply(&a)? == b);

    // 5. 流水线：一批读段并行比对，输出保持输入顺序
    let reads: Vec<(usize, Sequence)> = (0..16)
        .map(|i| {
            let start = i % 24;
            let seq = Sequence::from_symbols(
                Alphabet::Nucleotide,
                &reference[start..start + 20],
            )
            .unwrap();
            (i, seq)
        })
        .collect();

    let shared = Arc::new(aligner);
    let worker_aligner = Arc::clone(&shared);
    let config = PipelineConfig {
        threads: 4,
        window: 8,
        poll_timeout: Duration::from_millis(100),
    };
    let mut matched = 0usize;
    run_ordered(
        reads.into_iter(),
        move |(i, seq)| (i, worker_aligner.align(&seq)),
        |(i, outcome)| {
            if let Ok(AlignOutcome::Hit(hit)) = outcome {
                matched += 1;
                println!("read {:2} -> ref[{}..{}] 分数 {}", i, hit.ref_range.0, hit.ref_range.1, hit.score);
            }
        },
        &config,
        &CancelToken::new(),
    )?;
    println!("\n{} 条读段命中，完成！", matched);

    Ok(())
}
