//! Writes a small synthetic dataset for trying out `peaks-deg`:
//! `peaklist1.csv`, `peaklist2.csv`, `expression.csv` and `expression.parquet`.
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const N_GENES: usize = 400;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct Gene {
    symbol: String,
    accession: String,
    chrom: String,
    tss: u64,
}

fn gene_pool(rng: &mut SimpleRng) -> Vec<Gene> {
    (0..N_GENES)
        .map(|i| Gene {
            symbol: format!("GENE{i:04}"),
            accession: format!("NM_{:06}", 100000 + i * 7),
            chrom: format!("chr{}", 1 + rng.below(22)),
            tss: 10_000 + rng.below(50_000_000),
        })
        .collect()
}

/// Peaks for genes picked with probability `p`; some genes get a second peak.
fn write_peaklist(path: &str, genes: &[Gene], p: f64, rng: &mut SimpleRng) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record(["chr", "start", "end", "score", "gene_symbol", "accession"])?;
    let mut rows = 0;
    for gene in genes {
        if rng.next_f64() >= p {
            continue;
        }
        let copies = if rng.next_f64() < 0.1 { 2 } else { 1 };
        for _ in 0..copies {
            let offset = rng.below(4_000);
            let start = gene.tss.saturating_sub(2_000) + offset;
            let width = 150 + rng.below(850);
            let score = rng.gauss(50.0, 15.0).max(1.0);
            writer.write_record([
                gene.chrom.clone(),
                start.to_string(),
                (start + width).to_string(),
                format!("{score:.2}"),
                gene.symbol.clone(),
                gene.accession.clone(),
            ])?;
            rows += 1;
        }
    }
    writer.flush()?;
    Ok(rows)
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let genes = gene_pool(&mut rng);

    let p1 = write_peaklist("peaklist1.csv", &genes, 0.45, &mut rng)?;
    let p2 = write_peaklist("peaklist2.csv", &genes, 0.35, &mut rng)?;

    // Differentially expressed subset
    let mut symbols = Vec::new();
    let mut log_fc = Vec::new();
    let mut padj = Vec::new();
    for gene in &genes {
        if rng.next_f64() >= 0.3 {
            continue;
        }
        symbols.push(gene.symbol.clone());
        log_fc.push(rng.gauss(0.0, 2.0));
        padj.push(rng.next_f64() * 0.05);
    }

    let mut writer = csv::Writer::from_path("expression.csv").context("creating expression.csv")?;
    writer.write_record(["gene_symbol", "logFC", "padj"])?;
    for ((s, fc), p) in symbols.iter().zip(&log_fc).zip(&padj) {
        writer.write_record([s.clone(), format!("{fc:.4}"), format!("{p:.6}")])?;
    }
    writer.flush()?;

    let schema = Arc::new(Schema::new(vec![
        Field::new("gene_symbol", DataType::Utf8, false),
        Field::new("logFC", DataType::Float64, false),
        Field::new("padj", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(
                symbols.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(log_fc)),
            Arc::new(Float64Array::from(padj)),
        ],
    )
    .context("building expression batch")?;

    let file = std::fs::File::create("expression.parquet").context("creating expression.parquet")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing expression batch")?;
    writer.close().context("closing parquet writer")?;

    println!(
        "Wrote {p1} + {p2} peaks and {} expressed genes (of {N_GENES}) to peaklist1.csv, \
         peaklist2.csv, expression.csv and expression.parquet",
        symbols.len()
    );
    Ok(())
}
