//! Statement reconciliation example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use statement_reconciler::utils::{journal_from_table, MemoryStatementSource, TabularInput};
use statement_reconciler::{
    ColumnAmounts, PositionedToken, PriorStateLine, ReconcileConfig, Reconciler, ReportColumn,
};
use tracing_subscriber::EnvFilter;

fn tok(text: &str, x: f64, y: f64) -> PositionedToken {
    PositionedToken::new(text, x, y, 0)
}

fn row(y: f64, cells: &[(&str, f64)]) -> Vec<PositionedToken> {
    cells.iter().map(|(text, x)| tok(text, *x, y)).collect()
}

fn cells(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("statement_reconciler=info")),
        )
        .init();

    println!("Statement Reconciler - Orabank example\n");

    // 1. A one-page statement as a text front end would hand it over
    let mut page = vec![
        tok("Solde", 187.0, 120.0),
        tok("précédent", 216.0, 120.0),
        tok("500", 540.0, 120.0),
        tok("000", 552.0, 120.0),
    ];
    page.extend(row(
        140.0,
        &[
            ("02/10/2025", 40.0),
            ("PRELEVEMENT", 100.0),
            ("SONABEL", 160.0),
            ("45", 380.0),
            ("000", 392.0),
            ("455", 540.0),
            ("000", 552.0),
        ],
    ));
    page.extend(row(
        160.0,
        &[
            ("03/10/2025", 40.0),
            ("80000", 100.0),
            ("VERSEMENT", 150.0),
            ("535", 540.0),
            ("000", 552.0),
        ],
    ));
    page.extend(row(
        180.0,
        &[
            ("06/10/2025", 40.0),
            ("FRAIS", 100.0),
            ("TENUE", 150.0),
            ("5", 450.0),
            ("000", 462.0),
            ("530", 540.0),
            ("000", 552.0),
        ],
    ));
    page.extend(row(
        200.0,
        &[("Total", 100.0), ("général", 130.0), ("50", 380.0), ("000", 392.0)],
    ));

    let source = MemoryStatementSource::new();
    source.push_page(page)?;

    // 2. The journal for the same period
    let journal = journal_from_table(&TabularInput::new(
        "journal",
        cells(&["Date", "Libellé", "Débit", "Crédit", "Solde"]),
        vec![
            cells(&["01/10/2025", "Facture SONABEL", "", "45 000", "455 000"]),
            cells(&["03/10/2025", "Versement espèces", "80 000", "", "535 000"]),
            cells(&["05/10/2025", "Chèque fournisseur 7741", "", "12 000", "523 000"]),
        ],
    ))?;

    // 3. What was still open at the end of last month
    let prior = vec![PriorStateLine::new(
        NaiveDate::from_ymd_opt(2025, 9, 29),
        "Chèque 5512 non encaissé",
        ColumnAmounts::single(ReportColumn::JournalCredit, BigDecimal::from(18_000)),
    )];

    // 4. Run
    let reconciler = Reconciler::from_config(&ReconcileConfig::for_layout("orabank"))?;
    let run = reconciler
        .run(&source, &journal, prior, NaiveDate::from_ymd_opt(2025, 10, 31))
        .await?;

    println!("Extracted {} statement entries", run.extraction.entries.len());
    for correction in &run.extraction.corrections {
        println!(
            "  corrected entry {} ({:?}): {} -> {}",
            correction.entry, correction.kind, correction.before, correction.after
        );
    }

    let result = &run.result;
    println!("\nMatched pairs: {}", result.matched.len());
    println!("Statement suspense: {}", result.statement_suspense.len());
    println!("Journal suspense: {}\n", result.journal_suspense.len());

    println!(
        "{:<12} {:<32} {:>12} {:>12} {:>12} {:>12}",
        "Date", "Libellé", "Cpt débit", "Cpt crédit", "Rel. débit", "Rel. crédit"
    );
    let print_line = |date: String, label: &str, amounts: &ColumnAmounts| {
        println!(
            "{:<12} {:<32} {:>12} {:>12} {:>12} {:>12}",
            date,
            label,
            amounts.journal_debit,
            amounts.journal_credit,
            amounts.statement_debit,
            amounts.statement_credit
        );
    };
    print_line(String::new(), "Solde à rectifier", &result.opening);
    for row in &result.rows {
        let date = row
            .date
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_default();
        print_line(date, &row.label, &row.amounts);
    }
    print_line(String::new(), "Totaux", &result.totals);
    print_line(String::new(), &result.rectified_caption(), &result.rectified);
    print_line(String::new(), "Totaux généraux", &result.grand_totals);

    Ok(())
}
