use chrono::{Datelike, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use desk::backend::{Backend, RentalDraft};
use desk::config::{config_dir, init_config_dir};
use desk::convert::{RentalConversion, SaleConversion};
use desk::document::{self, html, Formatter, PrintModel};
use desk::model::{Payment, PaymentMethod, Quotation, QuotationStatus, Rental, RentalStatus, Sale};
use desk::status::QuotationAction;
use desk::totals::Priced;
use desk::{AppContext, DeskError, Result};

#[derive(Parser)]
#[command(name = "desk")]
#[command(version, about = "Quotation, sale and rental desk", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.desk or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config and an empty ledger
    Init,

    /// Show organization, backend and document counts
    Status,

    /// List quotations
    Quotations {
        /// Only show this status (pending, accepted, rejected, converted, expired)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// List sales
    Sales,

    /// List rentals
    Rentals {
        /// Only show this status (active, returned, overdue, cancelled)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Accept a pending quotation
    Accept {
        /// Quotation number or id
        quotation: String,
    },

    /// Reject a pending quotation
    Reject {
        /// Quotation number or id
        quotation: String,
    },

    /// Mark a pending quotation as expired
    Expire {
        /// Quotation number or id
        quotation: String,
    },

    /// Check whether a quotation can still be edited
    CanEdit {
        /// Quotation number or id
        quotation: String,
    },

    /// Expire every pending quotation past its validity date
    ExpireSweep,

    /// Convert an accepted sale quotation into a sale
    ConvertSale {
        /// Quotation number or id
        quotation: String,

        /// Payment method (cash, card, transfer, check)
        #[arg(short, long)]
        method: Option<String>,

        /// Record the full total as paid
        #[arg(long)]
        paid: bool,
    },

    /// Convert an accepted rental quotation into rentals
    ConvertRental {
        /// Quotation number or id
        quotation: String,

        /// Start date (YYYY-MM-DD, default: planned start or today)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD, default: planned end or a week after today)
        #[arg(long)]
        end: Option<String>,

        /// Deposit amount (default: planned deposit or 0)
        #[arg(long)]
        deposit: Option<f64>,

        /// Payment method (cash, card, transfer, check)
        #[arg(short, long)]
        method: Option<String>,

        /// Condition of the equipment at handoff
        #[arg(long)]
        condition: Option<String>,
    },

    /// Create a rental directly from products
    Rent {
        /// Client name
        #[arg(short, long)]
        client: String,

        /// Products in format "product_id:quantity" (can be repeated)
        #[arg(short, long, value_name = "ID:QTY")]
        item: Vec<String>,

        /// Start date (YYYY-MM-DD, default: today)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Deposit amount
        #[arg(long, default_value_t = 0.0)]
        deposit: f64,

        /// Payment method (cash, card, transfer, check)
        #[arg(short, long)]
        method: Option<String>,
    },

    /// Cancel a rental and put its items back into stock
    CancelRental {
        /// Rental number or id
        rental: String,
    },

    /// Record the return of a rental and put its items back into stock
    ReturnRental {
        /// Rental number or id
        rental: String,

        /// Condition of the equipment on return
        #[arg(long)]
        condition: Option<String>,
    },

    /// Mark every active rental past its end date as overdue
    OverdueSweep,

    /// Cancel a sale, whatever has been paid on it
    CancelSale {
        /// Sale number or id
        sale: String,
    },

    /// Record a payment against a sale
    Pay {
        /// Sale number or id
        sale: String,

        /// Payment amount
        amount: f64,

        /// Payment method (cash, card, transfer, check)
        #[arg(short, long)]
        method: Option<String>,

        /// Payment reference (receipt, transfer id)
        #[arg(long)]
        reference: Option<String>,

        /// Payment date (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Record a payment against a rental
    PayRental {
        /// Rental number or id
        rental: String,

        /// Payment amount
        amount: f64,

        /// Payment method (cash, card, transfer, check)
        #[arg(short, long)]
        method: Option<String>,

        /// Payment reference (receipt, transfer id)
        #[arg(long)]
        reference: Option<String>,

        /// Payment date (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Write a printable document
    Print {
        /// Kind of record
        #[arg(value_enum)]
        kind: DocumentArg,

        /// Document number or id
        number: String,

        /// Custom output file path (default: output_dir/<number>.html)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Produce a PDF through Typst instead of HTML
        #[arg(long)]
        pdf: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DocumentArg {
    Sale,
    Rental,
    Quotation,
}

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
}

/// Logs go to stderr; `DESK_LOG` takes an env-filter directive (default `warn`)
fn init_tracing() {
    let filter = EnvFilter::try_from_env("DESK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    if let Commands::Init = cli.command {
        return cmd_init(&cfg_dir);
    }
    let ctx = AppContext::load(cfg_dir)?;

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Status => cmd_status(&ctx),
        Commands::Quotations { status } => cmd_quotations(&ctx, status),
        Commands::Sales => cmd_sales(&ctx),
        Commands::Rentals { status } => cmd_rentals(&ctx, status),
        Commands::Accept { quotation } => cmd_transition(&ctx, &quotation, QuotationAction::Accept),
        Commands::Reject { quotation } => cmd_transition(&ctx, &quotation, QuotationAction::Reject),
        Commands::Expire { quotation } => cmd_transition(&ctx, &quotation, QuotationAction::Expire),
        Commands::CanEdit { quotation } => cmd_can_edit(&ctx, &quotation),
        Commands::ExpireSweep => cmd_expire_sweep(&ctx),
        Commands::ConvertSale {
            quotation,
            method,
            paid,
        } => cmd_convert_sale(&ctx, &quotation, method, paid),
        Commands::ConvertRental {
            quotation,
            start,
            end,
            deposit,
            method,
            condition,
        } => cmd_convert_rental(&ctx, &quotation, start, end, deposit, method, condition),
        Commands::Rent {
            client,
            item,
            start,
            end,
            deposit,
            method,
        } => cmd_rent(&ctx, &client, &item, start, &end, deposit, method),
        Commands::CancelRental { rental } => cmd_cancel_rental(&ctx, &rental),
        Commands::ReturnRental { rental, condition } => {
            cmd_return_rental(&ctx, &rental, condition)
        }
        Commands::OverdueSweep => cmd_overdue_sweep(&ctx),
        Commands::CancelSale { sale } => cmd_cancel_sale(&ctx, &sale),
        Commands::Pay {
            sale,
            amount,
            method,
            reference,
            date,
        } => cmd_pay(&ctx, &sale, amount, method, reference, date),
        Commands::PayRental {
            rental,
            amount,
            method,
            reference,
            date,
        } => cmd_pay_rental(&ctx, &rental, amount, method, reference, date),
        Commands::Print {
            kind,
            number,
            output,
            pdf,
        } => cmd_print(&ctx, kind, &number, output, pdf),
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn parse_date_arg(value: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| DeskError::Validation(format!("Invalid {flag} value: '{value}'")))
}

fn parse_method(ctx: &AppContext, method: Option<String>) -> Result<PaymentMethod> {
    match method {
        Some(m) => m.parse().map_err(DeskError::Validation),
        None => Ok(ctx.config().documents.default_payment_method),
    }
}

fn matches_ref(number: &str, id: i64, reference: &str) -> bool {
    number.eq_ignore_ascii_case(reference) || id.to_string() == reference
}

fn find_quotation(backend: &dyn Backend, reference: &str) -> Result<Quotation> {
    backend
        .quotations()?
        .into_iter()
        .find(|q| matches_ref(&q.quotation_number, q.id, reference))
        .ok_or_else(|| DeskError::NotFound {
            entity: "Quotation",
            id: reference.to_string(),
        })
}

fn find_sale(backend: &dyn Backend, reference: &str) -> Result<Sale> {
    backend
        .sales()?
        .into_iter()
        .find(|s| matches_ref(&s.sale_number, s.id, reference))
        .ok_or_else(|| DeskError::NotFound {
            entity: "Sale",
            id: reference.to_string(),
        })
}

fn find_rental(backend: &dyn Backend, reference: &str) -> Result<Rental> {
    backend
        .rentals()?
        .into_iter()
        .find(|r| matches_ref(&r.rental_number, r.id, reference))
        .ok_or_else(|| DeskError::NotFound {
            entity: "Rental",
            id: reference.to_string(),
        })
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    init_config_dir(cfg_dir)?;

    println!("Initialized desk config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit your organization details:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Add an [api] section to work against the REST API,");
    println!(
        "     or keep records in the local ledger: {}/state.toml",
        cfg_dir.display()
    );

    Ok(())
}

fn cmd_status(ctx: &AppContext) -> Result<()> {
    let backend = ctx.open_backend()?;
    let quotations = backend.quotations()?;
    let sales = backend.sales()?;
    let rentals = backend.rentals()?;
    let moment = now();

    let org_name = ctx.config().organization.name.as_deref().unwrap_or("(unnamed)");

    println!("Desk Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", ctx.cfg_dir().display());
    println!("Organization:     {org_name}");
    println!("Backend:          {}", ctx.mode());

    let pending = quotations
        .iter()
        .filter(|q| q.status == QuotationStatus::Pending)
        .count();
    let accepted = quotations
        .iter()
        .filter(|q| q.status == QuotationStatus::Accepted)
        .count();
    println!(
        "Quotations:       {} ({pending} pending, {accepted} accepted)",
        quotations.len()
    );

    let outstanding: f64 = sales.iter().map(|s| s.balance().max(0.0)).sum();
    println!(
        "Sales:            {} ({} outstanding)",
        sales.len(),
        ctx.formatter().currency(outstanding)
    );

    let active = rentals
        .iter()
        .filter(|r| r.effective_status(moment) == RentalStatus::Active)
        .count();
    let overdue = rentals
        .iter()
        .filter(|r| r.effective_status(moment) == RentalStatus::Overdue)
        .count();
    println!(
        "Rentals:          {} ({active} active, {overdue} overdue)",
        rentals.len()
    );

    if !ctx.is_remote() {
        let [quotation, sale, rental] = ctx.open_local()?.next_numbers(today().year());
        println!("Next quotation:   {quotation}");
        println!("Next sale:        {sale}");
        println!("Next rental:      {rental}");
    }

    Ok(())
}

// Table row structs for tabled
#[derive(Tabled)]
struct QuotationRow {
    #[tabled(rename = "NUMBER")]
    number: String,
    #[tabled(rename = "TYPE")]
    kind: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "VALID UNTIL")]
    valid_until: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "CLIENT")]
    client: String,
}

#[derive(Tabled)]
struct SaleRow {
    #[tabled(rename = "NUMBER")]
    number: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "PAID")]
    paid: String,
    #[tabled(rename = "BALANCE")]
    balance: String,
    #[tabled(rename = "CLIENT")]
    client: String,
}

#[derive(Tabled)]
struct RentalRow {
    #[tabled(rename = "NUMBER")]
    number: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "START")]
    start: String,
    #[tabled(rename = "END")]
    end: String,
    #[tabled(rename = "DAYS")]
    days: u32,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "DEPOSIT")]
    deposit: String,
    #[tabled(rename = "CLIENT")]
    client: String,
}

fn date_cell(date: Option<NaiveDate>, fmt: &dyn Formatter) -> String {
    date.map(|d| fmt.date(d)).unwrap_or_else(|| "-".to_string())
}

fn cmd_quotations(ctx: &AppContext, status: Option<String>) -> Result<()> {
    let filter: Option<QuotationStatus> = status
        .map(|s| s.parse().map_err(DeskError::Validation))
        .transpose()?;

    let backend = ctx.open_backend()?;
    let fmt = ctx.formatter();
    let rows: Vec<QuotationRow> = backend
        .quotations()?
        .iter()
        .filter(|q| filter.map_or(true, |f| q.status == f))
        .map(|q| QuotationRow {
            number: q.quotation_number.clone(),
            kind: q.quotation_type.to_string(),
            status: q.status.to_string(),
            date: date_cell(q.created_at, fmt),
            valid_until: date_cell(q.valid_until, fmt),
            total: fmt.currency(q.totals().display_total()),
            client: q.client.name.clone(),
        })
        .collect();

    if rows.is_empty() {
        println!("No quotations found.");
        return Ok(());
    }

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

fn cmd_sales(ctx: &AppContext) -> Result<()> {
    let backend = ctx.open_backend()?;
    let fmt = ctx.formatter();
    let rows: Vec<SaleRow> = backend
        .sales()?
        .iter()
        .map(|s| SaleRow {
            number: s.sale_number.clone(),
            date: date_cell(s.created_at, fmt),
            status: s.status.to_string(),
            total: fmt.currency(s.totals().display_total()),
            paid: fmt.currency(s.paid_amount),
            balance: fmt.currency(s.balance()),
            client: s.client.name.clone(),
        })
        .collect();

    if rows.is_empty() {
        println!("No sales found.");
        return Ok(());
    }

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

fn cmd_rentals(ctx: &AppContext, status: Option<String>) -> Result<()> {
    let filter: Option<RentalStatus> = status
        .map(|s| s.parse().map_err(DeskError::Validation))
        .transpose()?;

    let backend = ctx.open_backend()?;
    let fmt = ctx.formatter();
    let moment = now();
    let rows: Vec<RentalRow> = backend
        .rentals()?
        .iter()
        .filter(|r| filter.map_or(true, |f| r.effective_status(moment) == f))
        .map(|r| RentalRow {
            number: r.rental_number.clone(),
            status: r.effective_status(moment).to_string(),
            start: fmt.date(r.start_date.date()),
            end: fmt.date(r.end_date.date()),
            days: r.billed_days(),
            total: fmt.currency(r.totals().display_total()),
            deposit: fmt.currency(r.deposit),
            client: r.client.name.clone(),
        })
        .collect();

    if rows.is_empty() {
        println!("No rentals found.");
        return Ok(());
    }

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

fn cmd_transition(ctx: &AppContext, reference: &str, action: QuotationAction) -> Result<()> {
    let mut backend = ctx.open_backend()?;
    let mut quotation = find_quotation(backend.as_ref(), reference)?;

    let status = ctx
        .engine(backend.as_mut())
        .transition_quotation(&mut quotation, action)?;
    backend.commit()?;

    println!("Quotation {} is now {status}", quotation.quotation_number);
    Ok(())
}

fn cmd_can_edit(ctx: &AppContext, reference: &str) -> Result<()> {
    let mut backend = ctx.open_backend()?;
    let quotation = find_quotation(backend.as_ref(), reference)?;

    let editable = ctx.engine(backend.as_mut()).can_edit(&quotation)?;
    if editable {
        println!("Quotation {} can be edited", quotation.quotation_number);
    } else {
        println!(
            "Quotation {} cannot be edited ({})",
            quotation.quotation_number, quotation.status
        );
    }
    Ok(())
}

fn cmd_expire_sweep(ctx: &AppContext) -> Result<()> {
    let mut backend = ctx.open_backend()?;
    let mut quotations = backend.quotations()?;

    let expired = ctx
        .engine(backend.as_mut())
        .expire_quotations(&mut quotations, today())?;
    backend.commit()?;

    println!("Expired {} quotation(s)", expired.len());
    Ok(())
}

fn cmd_convert_sale(
    ctx: &AppContext,
    reference: &str,
    method: Option<String>,
    paid: bool,
) -> Result<()> {
    let mut backend = ctx.open_backend()?;
    let mut quotation = find_quotation(backend.as_ref(), reference)?;
    let payment_method = match method {
        Some(_) => parse_method(ctx, method)?,
        None => quotation
            .payment_method
            .unwrap_or(ctx.config().documents.default_payment_method),
    };

    let request = SaleConversion {
        payment_method,
        mark_paid: paid,
        date: today(),
    };
    let outcome = ctx
        .engine(backend.as_mut())
        .convert_to_sale(&mut quotation, &request);
    let sale = match outcome {
        Ok(sale) => sale,
        // the sale exists without its payment; keep the conversion
        Err(err @ DeskError::PaymentNotRecorded { .. }) => {
            backend.commit()?;
            return Err(err);
        }
        Err(err) => return Err(err),
    };
    backend.commit()?;

    println!(
        "Converted {} into sale {} ({}, {})",
        quotation.quotation_number,
        sale.sale_number,
        ctx.formatter().currency(sale.totals().display_total()),
        sale.status
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_convert_rental(
    ctx: &AppContext,
    reference: &str,
    start: Option<String>,
    end: Option<String>,
    deposit: Option<f64>,
    method: Option<String>,
    condition: Option<String>,
) -> Result<()> {
    let mut backend = ctx.open_backend()?;
    let mut quotation = find_quotation(backend.as_ref(), reference)?;
    let payment_method = match method {
        Some(_) => parse_method(ctx, method)?,
        None => quotation
            .payment_method
            .unwrap_or(ctx.config().documents.default_payment_method),
    };

    let request = RentalConversion {
        start_date: start.as_deref().map(|s| parse_date_arg(s, "--start")).transpose()?,
        end_date: end.as_deref().map(|s| parse_date_arg(s, "--end")).transpose()?,
        deposit,
        payment_method,
        condition_out: condition.unwrap_or_default(),
        today: today(),
    };
    let rentals = ctx
        .engine(backend.as_mut())
        .convert_to_rental(&mut quotation, &request)?;
    backend.commit()?;

    let numbers: Vec<&str> = rentals.iter().map(|r| r.rental_number.as_str()).collect();
    println!(
        "Converted {} into {} rental(s): {}",
        quotation.quotation_number,
        rentals.len(),
        numbers.join(", ")
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_rent(
    ctx: &AppContext,
    client: &str,
    items: &[String],
    start: Option<String>,
    end: &str,
    deposit: f64,
    method: Option<String>,
) -> Result<()> {
    if items.is_empty() {
        return Err(DeskError::Validation(
            "at least one --item is required".to_string(),
        ));
    }

    let mut backend = ctx.open_backend()?;
    let products = backend.products()?;

    let mut line_items = Vec::with_capacity(items.len());
    for entry in items {
        let (id_part, qty_part) = entry.split_once(':').unwrap_or((entry.as_str(), "1"));
        let product_id: i64 = id_part
            .trim()
            .parse()
            .map_err(|_| DeskError::Validation(format!("Invalid product id in '{entry}'")))?;
        let quantity: u32 = qty_part
            .trim()
            .parse()
            .map_err(|_| DeskError::Validation(format!("Invalid quantity in '{entry}'")))?;
        let product = products
            .iter()
            .find(|p| p.id == product_id)
            .ok_or_else(|| DeskError::NotFound {
                entity: "Product",
                id: product_id.to_string(),
            })?;
        let price = product.rental_price.unwrap_or(0.0);
        line_items.push(desk::model::LineItem::new(
            product.id,
            product.name.clone(),
            quantity,
            price,
        ));
    }

    let start_date = match start {
        Some(s) => parse_date_arg(&s, "--start")?,
        None => today(),
    };
    let end_date = parse_date_arg(end, "--end")?;

    let draft = RentalDraft {
        client: desk::model::Client::named(client),
        items: line_items,
        start_date: start_date.and_time(chrono::NaiveTime::MIN),
        end_date: end_date.and_time(chrono::NaiveTime::MIN),
        deposit,
        payment_method: parse_method(ctx, method)?,
        condition_out: String::new(),
        notes: String::new(),
        tax_rate: ctx.config().documents.default_tax_rate,
        discount_amount: 0.0,
        discount_percent: 0.0,
        quotation_id: None,
        date: today(),
    };

    let rentals = ctx.engine(backend.as_mut()).create_rentals(draft)?;
    backend.commit()?;

    for rental in &rentals {
        println!(
            "Created rental {} ({})",
            rental.rental_number,
            ctx.formatter().currency(rental.totals().display_total())
        );
    }
    Ok(())
}

fn cmd_cancel_rental(ctx: &AppContext, reference: &str) -> Result<()> {
    let mut backend = ctx.open_backend()?;
    let mut rental = find_rental(backend.as_ref(), reference)?;

    ctx.engine(backend.as_mut()).cancel_rental(&mut rental)?;
    backend.commit()?;

    println!("Rental {} cancelled", rental.rental_number);
    Ok(())
}

fn cmd_return_rental(ctx: &AppContext, reference: &str, condition: Option<String>) -> Result<()> {
    let mut backend = ctx.open_backend()?;
    let mut rental = find_rental(backend.as_ref(), reference)?;

    ctx.engine(backend.as_mut())
        .return_rental(&mut rental, condition)?;
    backend.commit()?;

    println!("Rental {} returned", rental.rental_number);
    Ok(())
}

fn cmd_overdue_sweep(ctx: &AppContext) -> Result<()> {
    let mut backend = ctx.open_backend()?;
    let mut rentals = backend.rentals()?;

    let changed = ctx
        .engine(backend.as_mut())
        .sweep_overdue(&mut rentals, now())?;
    backend.commit()?;

    println!("Marked {} rental(s) overdue", changed.len());
    Ok(())
}

fn build_payment(
    ctx: &AppContext,
    amount: f64,
    method: Option<String>,
    reference: Option<String>,
    date: Option<String>,
) -> Result<Payment> {
    let date = match date {
        Some(s) => parse_date_arg(&s, "--date")?,
        None => today(),
    };
    Ok(Payment {
        amount,
        method: parse_method(ctx, method)?,
        reference,
        date,
    })
}

fn cmd_cancel_sale(ctx: &AppContext, reference: &str) -> Result<()> {
    let mut backend = ctx.open_backend()?;
    let mut sale = find_sale(backend.as_ref(), reference)?;

    ctx.engine(backend.as_mut()).cancel_sale(&mut sale)?;
    backend.commit()?;

    println!("Sale {} cancelled", sale.sale_number);
    Ok(())
}

fn cmd_pay(
    ctx: &AppContext,
    reference: &str,
    amount: f64,
    method: Option<String>,
    payment_ref: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let payment = build_payment(ctx, amount, method, payment_ref, date)?;
    let mut backend = ctx.open_backend()?;
    let mut sale = find_sale(backend.as_ref(), reference)?;

    ctx.engine(backend.as_mut())
        .record_sale_payment(&mut sale, payment)?;
    backend.commit()?;

    let fmt = ctx.formatter();
    println!(
        "Recorded {} on sale {} (paid {}, balance {}, {})",
        fmt.currency(amount),
        sale.sale_number,
        fmt.currency(sale.paid_amount),
        fmt.currency(sale.balance()),
        sale.status
    );
    Ok(())
}

fn cmd_pay_rental(
    ctx: &AppContext,
    reference: &str,
    amount: f64,
    method: Option<String>,
    payment_ref: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let payment = build_payment(ctx, amount, method, payment_ref, date)?;
    let mut backend = ctx.open_backend()?;
    let mut rental = find_rental(backend.as_ref(), reference)?;

    ctx.engine(backend.as_mut())
        .record_rental_payment(&mut rental, payment)?;
    backend.commit()?;

    let fmt = ctx.formatter();
    println!(
        "Recorded {} on rental {} (paid {}, balance {})",
        fmt.currency(amount),
        rental.rental_number,
        fmt.currency(rental.paid_amount),
        fmt.currency(rental.balance())
    );
    Ok(())
}

fn cmd_print(
    ctx: &AppContext,
    kind: DocumentArg,
    reference: &str,
    output: Option<PathBuf>,
    pdf: bool,
) -> Result<()> {
    let backend = ctx.open_backend()?;
    let org = &ctx.config().organization;
    let fmt = ctx.formatter();

    let model: PrintModel = match kind {
        DocumentArg::Sale => document::print_sale(
            &find_sale(backend.as_ref(), reference)?,
            org,
            fmt,
            ctx.config().documents.due_days,
        ),
        DocumentArg::Rental => {
            document::print_rental(&find_rental(backend.as_ref(), reference)?, org, fmt)
        }
        DocumentArg::Quotation => {
            document::print_quotation(&find_quotation(backend.as_ref(), reference)?, org, fmt)
        }
    };

    let extension = if pdf { "pdf" } else { "html" };
    let path = output.unwrap_or_else(|| {
        ctx.output_dir()
            .join(format!("{}.{extension}", model.document_number))
    });
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    if pdf {
        desk::pdf::generate_pdf(&model, &path)?;
    } else {
        std::fs::write(&path, html::render(&model))?;
    }

    println!(
        "Wrote {} {} to {}",
        model.title,
        model.document_number,
        path.display()
    );
    Ok(())
}
