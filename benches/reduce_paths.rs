use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use allreduce_bench::bench::Benchmark;
use allreduce_bench::config::{BenchOptions, Inputs};
use allreduce_bench::memory::HostDevice;
use allreduce_bench::parallel::ThreadComm;
use allreduce_bench::utils::compare;

fn opts() -> BenchOptions {
    let inputs = Inputs::parse(
        "warmup_count = 1\ntest_count = 2\nmin_elements = 1024\nmax_elements = 1048576\n\
         mult_factor = 32\ncheck_result = 1\nepsilon = 1e-12\ndo_cuda_aware_mpi = 1\n",
    )
    .unwrap();
    BenchOptions::from_inputs(&inputs).unwrap()
}

fn bench_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("tolerance check");
    for n in [1 << 10, 1 << 16, 1 << 20] {
        let reference: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
        let staged = reference.clone();
        let aware = reference.clone();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let candidates = [("staged", &staged[..]), ("aware", &aware[..])];
                compare(black_box(&reference), black_box(&candidates), 1e-12, 32).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_size_iteration(c: &mut Criterion) {
    let opts = opts();
    let comm = ThreadComm::solo();
    let device = HostDevice::new();
    let mut group = c.benchmark_group("size iteration");
    for n in opts.sizes() {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut bench = Benchmark::<f64, _, _>::new(&opts, &comm, &device);
            b.iter(|| bench.run_size(black_box(n)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_check, bench_size_iteration);
criterion_main!(benches);
