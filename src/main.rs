use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use comfy_table::{Table, TableComponent};
use env_logger::Env;

use crate::aggregate::{AggregateResult, TimeSeries};
use crate::config::Config;
use crate::controller::Controller;
use crate::store::filter::TransactionFilter;
use crate::transaction::Transaction;

mod aggregate;
mod categoriser;
mod config;
mod controller;
mod csv_reader;
mod ingest;
mod money;
mod normaliser;
mod store;
mod tokeniser;
mod transaction;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// Config file path
    #[clap(long)]
    config: Option<PathBuf>,

    /// Data directory override
    #[clap(long)]
    data_dir: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a statement CSV file, or scan a directory for new ones
    Import {
        path: PathBuf,
    },
    /// Train the categoriser from a labelled example CSV
    Train {
        examples: PathBuf,
    },
    /// List transactions
    List {
        #[clap(flatten)]
        filter: FilterArgs,

        /// Print as JSON instead of a table
        #[clap(long)]
        json: bool,
    },
    /// Show totals, category breakdown and daily series
    Summary {
        #[clap(flatten)]
        filter: FilterArgs,

        /// Include unlabelled transactions in the category breakdown
        #[clap(long)]
        include_unlabelled: bool,

        /// Print as JSON instead of tables
        #[clap(long)]
        json: bool,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Start date (inclusive), e.g. 2024-01-01
    #[clap(long)]
    from: Option<NaiveDate>,

    /// End date (inclusive)
    #[clap(long)]
    to: Option<NaiveDate>,

    /// Categories to include; 'uncategorised' selects unlabelled rows
    #[clap(long = "category")]
    categories: Vec<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> TransactionFilter {
        let mut filter = TransactionFilter::new();
        if let Some(from) = self.from {
            filter = filter.from_date(from);
        }
        if let Some(to) = self.to {
            filter = filter.to_date(to);
        }
        filter.categories(self.categories.iter().cloned())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli: Cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from_file(path),
        None => Config::empty(),
    };
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| config.data_dir());
    let controller = Controller::open(&data_dir)?;

    match cli.command {
        Command::Import { path } => {
            controller::import::execute_import(&controller, &path)?;
        }

        Command::Train { examples } => {
            let bytes = fs::read(&examples)?;
            let examples = csv_reader::read_training_examples(&bytes)?;
            let model = controller.train_categoriser(&examples)?;
            println!("Model trained and activated; categories: {}", model.labels().join(", "));
        }

        Command::List { filter, json } => {
            let transactions = controller.list_transactions(&filter.to_filter());
            if json {
                println!("{}", serde_json::to_string_pretty(&transactions)?);
            } else {
                print_transactions(&transactions);
            }
        }

        Command::Summary { filter, include_unlabelled, json } => {
            let filter = filter.to_filter();
            let summary = controller.aggregate(&filter, include_unlabelled);
            let series = controller.time_series(&filter);
            if json {
                let output = serde_json::json!({ "summary": summary, "series": series });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_summary(&controller, &summary, &series);
            }
        }
    }

    Ok(())
}

fn plain_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.set_header(header);
    table.remove_style(TableComponent::HorizontalLines);
    table.remove_style(TableComponent::MiddleIntersections);
    table.remove_style(TableComponent::LeftBorderIntersections);
    table.remove_style(TableComponent::RightBorderIntersections);
    table
}

fn print_transactions(transactions: &[Transaction]) {
    let mut table = plain_table(vec!["Id", "Date", "Description", "Amount", "Category"]);
    for t in transactions {
        table.add_row(vec![
            t.id.to_string(),
            t.date.to_string(),
            t.description.clone(),
            t.amount.to_string(),
            t.category.clone(),
        ]);
    }
    println!("{table}");
    println!("{} transactions", transactions.len());
}

fn print_summary(controller: &Controller, summary: &AggregateResult, series: &TimeSeries) {
    println!("Income    {}", summary.total_income);
    println!("Expenses  {}", summary.total_expense.abs());
    println!("Net       {}", summary.net);

    if !summary.by_category.is_empty() {
        let mut table = plain_table(vec!["Category", "Total"]);
        for (category, total) in &summary.by_category {
            table.add_row(vec![category.clone(), total.to_string()]);
        }
        println!("{table}");
    }

    if !series.income.is_empty() || !series.expense.is_empty() {
        let mut table = plain_table(vec!["Date", "Income", "Expenses"]);
        let income: std::collections::BTreeMap<_, _> = series.income.iter().cloned().collect();
        let expense: std::collections::BTreeMap<_, _> = series.expense.iter().cloned().collect();
        let dates: std::collections::BTreeSet<_> = income.keys().chain(expense.keys()).cloned().collect();
        for date in dates {
            table.add_row(vec![
                date.to_string(),
                income.get(&date).map(|c| c.to_string()).unwrap_or_default(),
                expense.get(&date).map(|c| c.to_string()).unwrap_or_default(),
            ]);
        }
        println!("{table}");
    }

    let unlabelled = controller
        .list_transactions(&TransactionFilter::new().categories(vec!["uncategorised".to_string()]))
        .len();
    if unlabelled > 0 && controller.active_model().is_none() {
        println!("{} transactions are uncategorised and no model is trained; run 'findash train'", unlabelled);
    }
}
