//! Ledger fixtures and test doubles for the pipeline

use async_trait::async_trait;
use spedup_client::services::Sleeper;
use spedup_common::config::PipelineConfig;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Minimal EFD-style ledger: header, participant, an irrelevant C110
/// record, one document per `documents` and the trailer.
pub fn ledger_content(cnpj: &str, period_start: &str, documents: usize) -> String {
    let mut content = format!(
        "|0000|006|0|{}|31012024|EMPRESA TESTE LTDA|{}||SP|3550308||A|1|\r\n",
        period_start, cnpj
    );
    content.push_str("|0001|0|\r\n");
    content.push_str("|0150|F001|FORNECEDOR ABC|1058|11222333000144|||3550308||RUA A|10|||\r\n");
    for n in 0..documents {
        content.push_str(&format!(
            "|C100|0|1|F001|55|00|1|{:06}||01012024|01012024|100,00|0|0,00|0,00|100,00|9|0,00|0,00|0,00|0,00|0,00|0,00|0,00|0,00|0,00|0,00|0,00|0,00|\r\n",
            n + 1
        ));
        content.push_str("|C110|1|informacao complementar|\r\n");
    }
    content.push_str("|9999|42|\r\n");
    content
}

/// Write a ledger file into `dir`
pub fn write_ledger(dir: &Path, name: &str, cnpj: &str, period_start: &str, documents: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, ledger_content(cnpj, period_start, documents)).unwrap();
    path
}

/// File with no allow-listed record at all
pub fn write_irrelevant(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, "|C110|1|x|\r\n|C110|2|y|\r\n").unwrap();
    path
}

/// Pipeline settings small enough to exercise windows and chunks
pub fn small_pipeline() -> PipelineConfig {
    PipelineConfig {
        scan_window_bytes: 97,
        upload_chunk_bytes: 128,
        header_probe_bytes: 4096,
        poll_interval_ms: 2000,
        max_poll_ticks: Some(50),
        ..Default::default()
    }
}

/// Sleeper that returns immediately and counts calls
#[derive(Debug, Default)]
pub struct InstantSleeper {
    sleeps: AtomicU32,
}

impl InstantSleeper {
    pub fn sleeps(&self) -> u32 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}
