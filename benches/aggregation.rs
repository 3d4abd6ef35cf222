use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use labelfuse::{
    Class, ItemId, LabelAggregator, LabelingEngine, Polarity, RawItem, ReliabilityEstimator, Rule,
    RuleColumn, RuleSet, VoteMatrix,
};

const ITEMS: usize = 10_000;
const RULES: usize = 12;

/// Synthetic matrix with a fixed pattern: rule `j` fires on every item whose
/// index shares a residue with `j`, so coverage and conflicts vary per rule.
fn synthetic_matrix() -> VoteMatrix {
    let columns: Vec<RuleColumn> = (0..RULES)
        .map(|j| {
            let polarity = if j % 3 == 0 { Polarity::Negative } else { Polarity::Positive };
            RuleColumn::new(format!("rule_{j}"), polarity)
        })
        .collect();
    let mut votes = Vec::with_capacity(ITEMS * RULES);
    for i in 0..ITEMS {
        for (j, column) in columns.iter().enumerate() {
            let fires = (i * 7 + j * 13) % (j + 3) == 0;
            votes.push(if fires { column.polarity.class() } else { Class::Abstain });
        }
    }
    let ids = (0..ITEMS).map(|i| ItemId::new(format!("item-{i}"))).collect();
    VoteMatrix::from_votes(ids, columns, votes).unwrap()
}

fn bench_estimate(c: &mut Criterion) {
    let matrix = synthetic_matrix();
    let estimator = ReliabilityEstimator::default();

    let mut group = c.benchmark_group("estimate");
    group.throughput(Throughput::Elements(ITEMS as u64));
    group.bench_function("em_10k_items_12_rules", |b| {
        b.iter(|| black_box(estimator.estimate(black_box(&matrix))));
    });
    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let matrix = synthetic_matrix();
    let profile = ReliabilityEstimator::default().estimate(&matrix);
    let aggregator = LabelAggregator::default();

    let mut group = c.benchmark_group("aggregate");
    group.throughput(Throughput::Elements(ITEMS as u64));
    group.bench_function("labels_10k_items", |b| {
        b.iter(|| black_box(aggregator.aggregate(&matrix, &profile).unwrap()));
    });
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let rules = RuleSet::from_rules([
        Rule::pattern("closing_up", Polarity::Positive, "fech.*alta").unwrap(),
        Rule::pattern("closing_down", Polarity::Negative, "fech.*queda").unwrap(),
        Rule::pattern("dividends", Polarity::Positive, "pag.*dividendo").unwrap(),
    ])
    .unwrap();
    let engine = LabelingEngine::new(rules).unwrap();
    let headlines = [
        "Ibovespa fecha em alta de 1,2% puxado por bancos",
        "Dólar fecha em queda com fluxo estrangeiro",
        "Itaú anuncia pagamento de dividendos",
        "Copom mantém a Selic em 10,5%",
    ];
    let items: Vec<RawItem> = (0..1_000)
        .map(|i| RawItem::new(format!("{i}"), headlines[i % headlines.len()]))
        .collect();

    c.bench_function("batch/run_1k_headlines", |b| {
        b.iter(|| black_box(engine.run(items.clone()).unwrap()));
    });
}

criterion_group!(aggregation, bench_estimate, bench_aggregate, bench_batch);
criterion_main!(aggregation);
