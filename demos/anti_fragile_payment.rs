//! Anti-fragile payment retry example.
//!
//! Demonstrates fee quotation at creation, a clean single-attempt
//! payment, the hub-inserted alternate routes a retry falls back to, and
//! the terminal refund once every attempt is exhausted.

use corridor_mesh::cancel::CancellationToken;
use corridor_mesh::config::EngineConfig;
use corridor_mesh::core::country::CountryCode;
use corridor_mesh::core::currency::CurrencyCode;
use corridor_mesh::core::fx::FxRateMap;
use corridor_mesh::payment::hub::quote_alternates;
use corridor_mesh::payment::state_machine::PaymentStateMachine;
use rand::rngs::mock::StepRng;
use rust_decimal_macros::dec;

fn route(codes: &[&str]) -> Vec<CountryCode> {
    codes.iter().map(|c| CountryCode::new(*c)).collect()
}

fn main() {
    println!("╔═══════════════════════════════════════════════╗");
    println!("║  corridor-mesh: Anti-Fragile Payment Example  ║");
    println!("╚═══════════════════════════════════════════════╝\n");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("building a current-thread runtime");

    // --- Scenario 1: a clean payment over a direct corridor ---
    println!("━━━ Scenario 1: Direct Settlement ━━━\n");

    let config = EngineConfig::default();
    let sm = PaymentStateMachine::new(config.clone());
    let tx = sm
        .create(
            "demo-user",
            dec!(10_000),
            CurrencyCode::new("USD"),
            CurrencyCode::new("EUR"),
            route(&["USA", "GBR", "DEU"]),
            |_| false,
        )
        .unwrap();

    println!("Quoted fees for $10,000 USD over USA -> GBR -> DEU:");
    println!("  base_fee:     ${}", tx.fees.base_fee);
    println!("  hop_fees:     ${}", tx.fees.hop_fees);
    println!("  total_fees:   ${}", tx.fees.total_fees);
    println!("  final_amount: ${}\n", tx.fees.final_amount);

    let fx = FxRateMap::new();
    let cancel = CancellationToken::new();
    let result = runtime.block_on(sm.process(
        tx.id,
        &fx,
        0.0,
        &mut StepRng::new(0, 1),
        |code, success| println!("  hop to {code}: {}", if success { "ok" } else { "failed" }),
        &cancel,
    ));
    println!("\nFinal status: {:?}\n", result.unwrap().status);

    // --- Scenario 2: the alternate routes a retry would try ---
    println!("━━━ Scenario 2: Hub-Inserted Alternates ━━━\n");

    let direct = route(&["BRA", "MEX"]);
    let alternates = quote_alternates(&direct, &config.hub_order);
    println!("Original route: {}", format_route(&direct));
    for (i, alt) in alternates.iter().enumerate() {
        println!("  alternate #{}: {}", i + 1, format_route(alt));
    }
    println!();

    // --- Scenario 3: every attempt fails, triggering a refund ---
    println!("━━━ Scenario 3: Exhausted Retries Trigger a Refund ━━━\n");

    let mut config = EngineConfig::default();
    config.hub_order = vec![CountryCode::new("HKG"), CountryCode::new("SGP")];
    let sm = PaymentStateMachine::new(config);
    let tx = sm
        .create(
            "demo-user",
            dec!(5_000),
            CurrencyCode::new("USD"),
            CurrencyCode::new("EUR"),
            route(&["USA", "DEU"]),
            |_| false,
        )
        .unwrap();

    let result = runtime.block_on(sm.execute_with_retry(
        tx.id,
        &fx,
        1.0,
        &mut StepRng::new(0, 1),
        |code, _| println!("  attempted hop through {code}, forced failure"),
        |external_id| format!("refund-{external_id}"),
        &cancel,
    ));
    let tx = result.unwrap();
    println!(
        "\nFinal status: {:?}, refund_id: {:?}, attempts: {}",
        tx.status, tx.refund_id, tx.attempt
    );
}

fn format_route(r: &[CountryCode]) -> String {
    r.iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
