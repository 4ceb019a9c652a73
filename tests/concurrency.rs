use std::sync::Barrier;
use std::thread;

use polycast::prelude::*;

define_facet! {
    interface Ledger {
        prop hits: i64;
        prop entries: List<String>;
        prop visitors: Set<u32>;
    }
}

const THREADS: usize = 8;
const ROUNDS: usize = 200;

fn ledger_property(name: &str) -> &'static PropertyInfo {
    <dyn Ledger as Facet>::info().property(name).unwrap()
}

#[test]
fn racing_reads_share_one_default_container() {
    let entity = Context::new().new_entity();
    let start = Barrier::new(THREADS);
    let containers: Vec<Value> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    start.wait();
                    entity
                        .get_property(ledger_property("entries"))
                        .unwrap()
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert!(containers.iter().all(|container| *container == containers[0]));
    assert_eq!(
        entity.get_property(ledger_property("entries")).unwrap(),
        Some(containers[0].clone())
    );
}

#[test]
fn concurrent_writes_to_one_entity_are_not_lost() {
    let entity = Context::new().new_entity();
    let start = Barrier::new(THREADS);
    thread::scope(|scope| {
        for worker in 0..THREADS {
            let entity = &entity;
            let start = &start;
            scope.spawn(move || {
                start.wait();
                for round in 0..ROUNDS {
                    let n = worker * ROUNDS + round;
                    entity
                        .set_property(
                            ledger_property("entries"),
                            Some(Value::from(format!("{worker}-{round}"))),
                        )
                        .unwrap();
                    assert!(entity.try_set_member("visitors", Some(Value::from(n as u32))));
                    entity.set::<dyn Ledger, i64>("hits", n as i64).unwrap();
                    let hits = entity.get::<dyn Ledger, i64>("hits").unwrap();
                    assert!((0..(THREADS * ROUNDS) as i64).contains(&hits));
                }
            });
        }
    });

    let entries = entity.get::<dyn Ledger, List<String>>("entries").unwrap();
    assert_eq!(entries.len(), THREADS * ROUNDS);
    let entries = entries.to_vec();
    for worker in 0..THREADS {
        for round in 0..ROUNDS {
            assert!(entries.contains(&format!("{worker}-{round}")));
        }
    }

    let visitors = entity.get::<dyn Ledger, Set<u32>>("visitors").unwrap();
    assert_eq!(visitors.len(), THREADS * ROUNDS);
    for n in 0..(THREADS * ROUNDS) as u32 {
        assert!(visitors.contains(&n));
    }

    let hits = entity.get::<dyn Ledger, i64>("hits").unwrap();
    assert!((0..(THREADS * ROUNDS) as i64).contains(&hits));
}
