//! Concurrency tests: queries racing against series registration
//!
//! 25 writers register 10,000 series while readers keep listing. Every
//! query must succeed and return a sorted, duplicate-free set of complete
//! names drawn from the series being written.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use series_select::config::ApplicationConfig;
use series_select::namespace::SeriesRegistry;
use series_select::query::{QueryEngine, QueryOutput};
use series_select::types::SeriesType;

const SERIES: usize = 10_000;
const WRITERS: usize = 25;

fn generated_names() -> Arc<Vec<String>> {
    Arc::new(
        (0..SERIES)
            .map(|i| match i % 3 {
                0 => format!("a.series.{:05}", i),
                1 => format!("b.series.{:05}", i),
                _ => format!("c.series.{:05}", i),
            })
            .collect(),
    )
}

fn engine(registry: Arc<SeriesRegistry>) -> Arc<QueryEngine> {
    let mut config = ApplicationConfig::default();
    config.query.default_list_limit = 20_000;
    // Exercise the parallel matching path while writers are active
    config.query.parallel_threshold = 1_000;
    Arc::new(QueryEngine::new(registry, &config).unwrap())
}

fn listed(output: QueryOutput) -> Vec<String> {
    match output {
        QueryOutput::Series { series, .. } => series
            .into_iter()
            .map(|row| row[0].as_str().unwrap().to_string())
            .collect(),
        other => panic!("unexpected output: {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_queries_during_concurrent_registration() {
    let names = generated_names();
    let valid: Arc<HashSet<String>> = Arc::new(names.iter().cloned().collect());
    let registry = Arc::new(SeriesRegistry::new());
    let engine = engine(Arc::clone(&registry));
    let done = Arc::new(AtomicBool::new(false));

    // Every writer inserts every series, like parallel bulk inserts
    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let registry = Arc::clone(&registry);
            let names = Arc::clone(&names);
            tokio::task::spawn_blocking(move || {
                let offset = w * (SERIES / WRITERS);
                for i in 0..SERIES {
                    let name = &names[(offset + i) % SERIES];
                    registry
                        .insert_points(name, SeriesType::Float, 1)
                        .unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = [
        "list series /.*/ - /a.*/ | /b.*/",
        "list series /.*/ ^ /a.*/ & /.*/",
        "list series /.*/ | /.*/",
    ]
    .into_iter()
    .map(|statement| {
        let engine = Arc::clone(&engine);
        let valid = Arc::clone(&valid);
        let done = Arc::clone(&done);
        tokio::task::spawn_blocking(move || {
            let mut runs = 0;
            while !done.load(Ordering::Acquire) || runs == 0 {
                let result = listed(engine.execute(statement).unwrap());

                let unique: HashSet<&String> = result.iter().collect();
                assert_eq!(unique.len(), result.len(), "duplicates in {}", statement);
                assert!(result.windows(2).all(|w| w[0] < w[1]));
                for name in &result {
                    assert!(valid.contains(name), "unexpected name {:?}", name);
                }
                runs += 1;
            }
            runs
        })
    })
    .collect();

    for writer in writers {
        writer.await.unwrap();
    }
    done.store(true, Ordering::Release);
    for reader in readers {
        assert!(reader.await.unwrap() > 0);
    }

    // Converged state
    assert_eq!(registry.len(), SERIES);
    let all = listed(engine.execute("list series /.*/").unwrap());
    assert_eq!(all.len(), SERIES);

    let count = engine.execute("count series /a.*/ | /b.*/").unwrap();
    assert_eq!(
        count,
        QueryOutput::Count {
            series: names.iter().filter(|n| !n.starts_with('c')).count()
        }
    );

    for name in names.iter().take(10) {
        let entry = registry.get(name).unwrap();
        assert_eq!(entry.length(), WRITERS as u64);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_list_limit_changes_are_atomic() {
    let registry = Arc::new(SeriesRegistry::new());
    for i in 0..100 {
        registry
            .get_or_register(&format!("s{:03}", i), SeriesType::Integer)
            .unwrap();
    }
    let engine = engine(registry);

    let admin = {
        let engine = Arc::clone(&engine);
        tokio::task::spawn_blocking(move || {
            for limit in (0..200u64).rev() {
                engine
                    .execute(&format!("alter database set list_limit {}", limit))
                    .unwrap();
            }
        })
    };

    let reader = {
        let engine = Arc::clone(&engine);
        tokio::task::spawn_blocking(move || {
            let mut previous = usize::MAX;
            for _ in 0..500 {
                // Always a sorted prefix cut at a single list_limit value
                let names = listed(engine.execute("list series /s.*/").unwrap());
                for (i, name) in names.iter().enumerate() {
                    assert_eq!(name, &format!("s{:03}", i));
                }
                // The limit only decreases
                assert!(names.len() <= previous);
                previous = names.len();
            }
        })
    };

    admin.await.unwrap();
    reader.await.unwrap();
    assert_eq!(
        engine.execute("show list_limit").unwrap(),
        QueryOutput::ListLimit { list_limit: 0 }
    );
}
