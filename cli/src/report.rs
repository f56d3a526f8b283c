use clap::Args;
use eyre::Result;
use livewind::Table;
use tokio::io::AsyncWriteExt;

use crate::io::open_output;

/// How and where a table is written.
#[derive(Args, Debug)]
pub struct Encoding {
    /// Output encoding (json, csv, text)
    #[clap(long, default_value = "json")]
    pub to: String,

    /// Output file [default: stdout]
    #[clap(long, default_value = "stdout")]
    pub output: String,
}

pub fn render(to: &str, table: &Table) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match to {
        "json" => livewind::report_json(table, &mut buf)?,
        "csv" => livewind::report_csv(table, &mut buf)?,
        "text" => livewind::report_text(table, &mut buf)?,
        other => eyre::bail!("unknown output encoding: {}", other),
    }
    Ok(buf)
}

pub async fn write_table(opts: &Encoding, table: &Table) -> Result<()> {
    let buf = render(&opts.to, table)?;
    let mut output = open_output(&opts.output).await?;
    output.write_all(&buf).await?;
    output.flush().await?;
    Ok(())
}
