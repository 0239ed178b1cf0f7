use criterion::{Criterion, criterion_group, criterion_main};
use hstrat::dataframe::{Frame, SurfaceBuildTree, explode_annotations};
use hstrat::model::Annotation;
use hstrat::reconstruction::{BiasAdjustment, BuildTreeTrie};

const DSTREAM_S: u32 = 32;

const REGRESSION_POPULATIONS: &[(&str, u64)] = &[("members-100", 100), ("members-1k", 1_000)];

const REPORTING_POPULATIONS: &[(&str, u64)] = &[("members-10k", 10_000)];

/// Synthetic population of a binary radiation: member `m` agrees with
/// member `n` up to the rank where their ids first differ.
fn population(num_members: u64) -> Vec<Annotation> {
    let depth = u64::from(u64::BITS - num_members.leading_zeros());
    (0..num_members)
        .map(|member| {
            let retained = (0..u64::from(DSTREAM_S))
                .map(|rank| {
                    let level = rank * depth / u64::from(DSTREAM_S);
                    (rank, (member >> (depth - level).min(63)) & 0xff)
                })
                .collect();
            Annotation::new(u64::from(DSTREAM_S), 8, retained).unwrap()
        })
        .collect()
}

fn exploded(num_members: u64) -> Frame {
    let taxa: Vec<(u64, Annotation)> = population(num_members)
        .into_iter()
        .enumerate()
        .map(|(data_id, annotation)| (data_id as u64, annotation))
        .collect();
    explode_annotations(&taxa, DSTREAM_S).unwrap()
}

fn build_tree_trie(c: &mut Criterion) {
    for (name, num_members) in REGRESSION_POPULATIONS {
        let population = population(*num_members);
        c.bench_function(&format!("build_tree_trie/{name}"), |b| {
            b.iter(|| BuildTreeTrie::new().build(&population).unwrap());
        });
        c.bench_function(&format!("build_tree_trie_rollbacks/{name}"), |b| {
            b.iter(|| {
                BuildTreeTrie::new()
                    .with_seed(Some(1))
                    .with_bias_adjustment(BiasAdjustment::SampleAncestralRollbacks)
                    .build(&population)
                    .unwrap()
            });
        });
    }
}

fn surface_build_tree(c: &mut Criterion) {
    for (name, num_members) in REGRESSION_POPULATIONS {
        let frame = exploded(*num_members);
        c.bench_function(&format!("surface_build_tree/{name}"), |b| {
            b.iter(|| SurfaceBuildTree::new().build(&frame).unwrap());
        });
    }
}

fn reporting(c: &mut Criterion) {
    for (name, num_members) in REPORTING_POPULATIONS {
        let population = population(*num_members);
        c.bench_function(&format!("build_tree_trie/{name}"), |b| {
            b.iter(|| BuildTreeTrie::new().build(&population).unwrap());
        });
        let frame = exploded(*num_members);
        c.bench_function(&format!("surface_build_tree_sliced/{name}"), |b| {
            b.iter(|| {
                SurfaceBuildTree::new()
                    .with_exploded_slice_size(DSTREAM_S as usize * 1_000)
                    .build(&frame)
                    .unwrap()
            });
        });
    }
}

criterion_group!(regression, build_tree_trie, surface_build_tree);
criterion_group! {
    name = reporting_group;
    config = Criterion::default().sample_size(10);
    targets = reporting
}
criterion_main!(regression, reporting_group);
