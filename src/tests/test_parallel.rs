use crate::error::MazeError;
use crate::parallel::{barrier_round, fork_join_chunks, try_fork_join_chunks, Executor};

#[test]
fn test_fork_join_chunks_sums() {
    let items: Vec<usize> = (1..=1000).collect();
    let total: usize = fork_join_chunks(&items, 100, |chunk| chunk.iter().sum());
    assert_eq!(total, 500_500);

    let empty: Vec<usize> = Vec::new();
    assert_eq!(fork_join_chunks(&empty, 10, |chunk: &[usize]| chunk.len()), 0);
}

#[test]
fn test_try_fork_join_chunks_propagates_error() {
    let items: Vec<usize> = (0..250).collect();
    let ok: usize = try_fork_join_chunks(&items, 100, |chunk| Ok(chunk.len())).unwrap();
    assert_eq!(ok, 250);

    let err = try_fork_join_chunks(&items, 100, |chunk: &[usize]| {
        if chunk.contains(&120) {
            Err(MazeError::UnknownNode(120))
        } else {
            Ok(chunk.len())
        }
    })
    .unwrap_err();
    assert_eq!(err, MazeError::UnknownNode(120));
}

#[test]
fn test_barrier_round_runs_every_participant() {
    let mut counters = vec![0usize; 12];
    for _ in 0..3 {
        barrier_round(&mut counters, |index, counter| {
            *counter += index;
            Ok(())
        })
        .unwrap();
    }
    for (index, counter) in counters.iter().enumerate() {
        assert_eq!(*counter, 3 * index);
    }
}

#[test]
fn test_barrier_round_error() {
    let mut participants = vec![(); 4];
    let result = barrier_round(&mut participants, |index, _| {
        if index == 2 {
            Err(MazeError::UnknownNode(index))
        } else {
            Ok(())
        }
    });
    assert!(result.is_err());
}

#[test]
fn test_executor_threads() {
    let executor = Executor::new(Some(2)).unwrap();
    assert_eq!(executor.num_threads(), 2);
    assert_eq!(executor.install(rayon::current_num_threads), 2);

    let global = Executor::default();
    assert_eq!(global.num_threads(), rayon::current_num_threads());
}
