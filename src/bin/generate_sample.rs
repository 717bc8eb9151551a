use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One synthetic row. `None` cells are written as missing values.
struct Row {
    state: &'static str,
    crop: &'static str,
    year: i64,
    employment: Option<f64>,
    production: Option<f64>,
    rainfall: Option<f64>,
    msp: Option<f64>,
    yield_kg_ha: Option<f64>,
}

const COLUMNS: [&str; 8] = [
    "State",
    "Crop",
    "year",
    "Employment_demanded",
    "Production_(in_Tonnes)",
    "Annual_rainfall",
    "MSP",
    "Yield_(kg/Ha)",
];

fn generate(rng: &mut SimpleRng) -> Vec<Row> {
    // (state, base rainfall mm, base employment demand)
    let states = [
        ("Punjab", 650.0, 1.2e6),
        ("Uttar Pradesh", 990.0, 8.5e6),
        ("Maharashtra", 1180.0, 4.1e6),
        ("Tamil Nadu", 950.0, 6.3e6),
        ("West Bengal", 1750.0, 7.2e6),
    ];
    // (crop, base MSP Rs/quintal, base yield kg/ha)
    let crops = [
        ("Rice", 1750.0, 2600.0),
        ("Wheat", 1840.0, 3300.0),
        ("Maize", 1700.0, 2900.0),
        ("Cotton", 5250.0, 450.0),
    ];

    let mut rows = Vec::new();
    for &(state, rain_base, emp_base) in &states {
        for &(crop, msp_base, yield_base) in &crops {
            for (i, year) in (2014..=2022).enumerate() {
                let rainfall = rng.gauss(rain_base, rain_base * 0.15).max(50.0);
                let msp = msp_base * (1.0 + 0.05 * i as f64);
                let yield_kg_ha = (yield_base
                    + 0.4 * (rainfall - rain_base)
                    + 0.1 * (msp - msp_base)
                    + rng.gauss(0.0, yield_base * 0.05))
                .max(0.0);
                let area_ha = rng.gauss(4.0e5, 6.0e4).max(1.0e4);
                let production = yield_kg_ha * area_ha / 1000.0;
                let employment = rng.gauss(emp_base, emp_base * 0.1).max(0.0).round();

                // About one cell in twenty-five is left empty.
                let mut maybe = |v: f64| (rng.next_f64() >= 0.04).then_some(v);
                rows.push(Row {
                    state,
                    crop,
                    year,
                    employment: maybe(employment),
                    production: maybe(production.round()),
                    rainfall: maybe((rainfall * 10.0).round() / 10.0),
                    msp: Some(msp.round()),
                    yield_kg_ha: maybe(yield_kg_ha.round()),
                });
            }
        }
    }
    rows
}

fn cell(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer.write_record(COLUMNS)?;
    for r in rows {
        writer.write_record([
            r.state.to_string(),
            r.crop.to_string(),
            r.year.to_string(),
            cell(r.employment),
            cell(r.production),
            cell(r.rainfall),
            cell(r.msp),
            cell(r.yield_kg_ha),
        ])?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[Row]) -> Result<()> {
    let float_field = |name: &str| Field::new(name, DataType::Float64, true);
    let schema = Arc::new(Schema::new(vec![
        Field::new(COLUMNS[0], DataType::Utf8, false),
        Field::new(COLUMNS[1], DataType::Utf8, false),
        Field::new(COLUMNS[2], DataType::Int64, false),
        float_field(COLUMNS[3]),
        float_field(COLUMNS[4]),
        float_field(COLUMNS[5]),
        float_field(COLUMNS[6]),
        float_field(COLUMNS[7]),
    ]));

    let floats = |f: fn(&Row) -> Option<f64>| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(rows.iter().map(|r| r.state).collect::<Vec<_>>())),
        Arc::new(StringArray::from(rows.iter().map(|r| r.crop).collect::<Vec<_>>())),
        Arc::new(Int64Array::from(rows.iter().map(|r| r.year).collect::<Vec<_>>())),
        floats(|r| r.employment),
        floats(|r| r.production),
        floats(|r| r.rainfall),
        floats(|r| r.msp),
        floats(|r| r.yield_kg_ha),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating Parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating Parquet writer")?;
    writer.write(&batch).context("writing Parquet batch")?;
    writer.close().context("closing Parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng);

    let dir = Path::new("sample_data");
    std::fs::create_dir_all(dir).context("creating sample_data directory")?;

    let csv_path = dir.join("agri.csv");
    write_csv(&csv_path, &rows)?;
    let parquet_path = dir.join("agri.parquet");
    write_parquet(&parquet_path, &rows)?;

    println!(
        "Wrote {} rows to {} and {}",
        rows.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
