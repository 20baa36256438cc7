//! # Counter Simulation
//!
//! Runs a few finalizations against the in-memory document store and prints
//! each receipt summary as JSON.
//!
//! ## Usage
//! ```bash
//! # Default configuration
//! cargo run -p mostrador-engine --bin simulate
//!
//! # Custom config file and verbose logs
//! RUST_LOG=debug cargo run -p mostrador-engine --bin simulate -- --config ./billing.toml
//! ```
//!
//! ## Scenarios
//! - Cash sale fully in stock
//! - Card sale with a shortfall, finalized anyway
//! - Split payment (cash + card)
//! - Proforma issued, then converted to an invoice
//! - Salesperson invoice settled at the cashier

use chrono::Utc;
use mostrador_core::cart::CatalogProduct;
use mostrador_core::document::DocumentKind;
use mostrador_core::payment::{PaymentPlan, PaymentSplit};
use mostrador_core::{AuthorizationFlags, Client, Money, PaymentMethod, ProductId};
use mostrador_engine::{
    init_tracing, EngineConfig, EngineError, FinalizationOutcome, FinalizationSession,
    FinalizationSummary, InMemoryGateway, Orchestrator, ShortageDecision,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Catalog for the simulation: (id, name, base price in colones, stock)
const CATALOG: &[(i64, &str, i64, i64)] = &[
    (1, "Cemento gris 50kg", 1000, 40),
    (2, "Varilla corrugada 3/8", 500, 4),
    (3, "Clavos 2 pulgadas (kg)", 1250, 25),
    (4, "Pintura latex galon", 8900, 6),
];

#[tokio::main]
async fn main() {
    init_tracing();

    let config_path = parse_config_arg();
    let config = EngineConfig::load_or_default(config_path);

    let gateway = Arc::new(
        CATALOG
            .iter()
            .fold(InMemoryGateway::new(), |gw, (id, _, _, stock)| {
                gw.with_stock(ProductId(*id), *stock)
            }),
    );
    let orchestrator = Orchestrator::new(gateway.clone(), config);

    info!(store = orchestrator.config().store_name(), "Starting counter simulation");

    if let Err(e) = run(&orchestrator, &gateway).await {
        error!(error = %e, "Simulation failed");
        std::process::exit(1);
    }

    info!(
        submitted = gateway.submit_calls(),
        adjusted = gateway.applied_decrements(),
        "Simulation complete"
    );
}

async fn run(orchestrator: &Orchestrator, gateway: &InMemoryGateway) -> Result<(), EngineError> {
    let cashier = AuthorizationFlags::cashier();

    // Cash sale, fully in stock
    let mut session = counter_session(&[(1, 5)])?;
    let outcome = orchestrator.begin_finalization(&mut session, cashier).await?;
    print_outcome("cash sale", &outcome);

    // Card sale with a shortfall, finalized anyway
    let mut session = counter_session(&[(2, 10), (3, 2)])?;
    session.set_payment(PaymentPlan::single(PaymentMethod::Card))?;
    if let FinalizationOutcome::ShortageDecisionRequired(short) =
        orchestrator.begin_finalization(&mut session, cashier).await?
    {
        info!(lines = short.len(), "Operator chose to bill the shortfall");
        let outcome = orchestrator
            .resolve_shortage(&mut session, ShortageDecision::ProceedAnyway)
            .await?;
        print_outcome("shortfall sale", &outcome);
    }

    // Split payment
    let mut session = counter_session(&[(1, 5)])?;
    let total = orchestrator.session_totals(&session).total;
    let cash = Money::from_major(3000);
    session.set_payment(PaymentPlan::split(vec![
        PaymentSplit::new(PaymentMethod::Cash, cash),
        PaymentSplit::new(PaymentMethod::Card, total - cash).with_reference("AUTH-4411"),
    ]))?;
    let outcome = orchestrator.begin_finalization(&mut session, cashier).await?;
    print_outcome("split sale", &outcome);

    // Proforma, then conversion
    let mut session = counter_session(&[(4, 2), (3, 4)])?;
    session.set_kind(DocumentKind::Proforma)?;
    let outcome = orchestrator.begin_finalization(&mut session, cashier).await?;
    print_outcome("proforma", &outcome);

    if let Some(summary) = outcome.summary() {
        if let Some(proforma) = gateway.proforma(&summary.document_number).await {
            info!(
                proforma = %proforma.number,
                days_remaining = proforma.days_remaining(Utc::now()),
                "Converting proforma"
            );
            let mut session = FinalizationSession::new();
            let outcome = orchestrator
                .convert_proforma(&mut session, &proforma, cashier)
                .await?;
            print_outcome("converted proforma", &outcome);
        }
    }

    // Salesperson invoice, settled at the cashier
    let mut session = counter_session(&[(3, 3)])?;
    let outcome = orchestrator
        .begin_finalization(&mut session, AuthorizationFlags::salesperson())
        .await?;
    print_outcome("pending invoice", &outcome);

    if let Some(summary) = outcome.summary() {
        if let Some(invoice) = gateway.invoice(&summary.document_number).await {
            let outcome = orchestrator
                .settle_pending_invoice(&invoice, &PaymentPlan::single(PaymentMethod::Cash), cashier, true)
                .await?;
            print_outcome("settled invoice", &outcome);
        }
    }

    Ok(())
}

fn counter_session(items: &[(i64, i64)]) -> Result<FinalizationSession, EngineError> {
    let mut session = FinalizationSession::new();
    let cart = session.cart_mut()?;
    cart.select_client(Client {
        id: 1001,
        name: "Ferreteria El Roble".to_string(),
        identification: Some("3-101-123456".to_string()),
        email: None,
        phone: None,
    });

    for (product_id, qty) in items {
        let Some((id, name, base, stock)) = CATALOG.iter().find(|(id, ..)| id == product_id) else {
            continue;
        };
        let product = CatalogProduct {
            product_id: ProductId(*id),
            name: name.to_string(),
            // Counter screen allows overselling; reconciliation catches it.
            available_stock: (*stock).max(*qty),
        };
        cart.add_line(&product, *qty, Money::from_major(*base))?;
    }

    Ok(session)
}

fn print_outcome(label: &str, outcome: &FinalizationOutcome) {
    match outcome {
        FinalizationOutcome::Completed(summary) => print_summary(label, summary),
        FinalizationOutcome::ShortageDecisionRequired(lines) => {
            println!("== {} ==", label);
            println!("shortage on {} line(s)", lines.len());
        }
    }
}

fn print_summary(label: &str, summary: &FinalizationSummary) {
    println!("== {} ==", label);
    match serde_json::to_string_pretty(summary) {
        Ok(json) => println!("{}", json),
        Err(e) => error!(error = %e, "Failed to render summary"),
    }
}

fn parse_config_arg() -> Option<PathBuf> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}
