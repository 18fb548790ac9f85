use criterion::{Criterion, black_box, criterion_group, criterion_main};

use neural_lemmatizer::{Activation, Likelihood, Matrix, Mlp, ZeroNorm};

const BATCH: usize = 16;

fn inputs(mlp: &Mlp) -> (Matrix, Matrix) {
    let x: Vec<f32> = (0..BATCH * mlp.input_dim())
        .map(|i| ((i % 17) as f32 - 8.0) * 0.05)
        .collect();
    let y: Vec<f32> = (0..BATCH * mlp.output_dim())
        .map(|i| ((i % 13) as f32 - 6.0) * 0.1 + 0.05)
        .collect();
    (
        Matrix::from_flat(x, mlp.input_dim()).unwrap(),
        Matrix::from_flat(y, mlp.output_dim()).unwrap(),
    )
}

fn mlp_predict_bench(c: &mut Criterion) {
    // Lemmatizer-shaped: 300-d embedding + POS column in, 300-d out.
    let mlp = Mlp::build(&[301, 1000, 300], Activation::Tanh).unwrap();
    let weights = mlp.init_weights_with_seed(0.001, 0);
    let (x, _) = inputs(&mlp);

    c.bench_function("mlp_predict_301_1000_300_batch16", |b| {
        b.iter(|| {
            let out = mlp.predict(black_box(&weights), black_box(&x)).unwrap();
            black_box(out);
        })
    });
}

fn mlp_gradient_bench(c: &mut Criterion) {
    let mlp = Mlp::build(&[301, 1000, 300], Activation::Tanh).unwrap();
    let weights = mlp.init_weights_with_seed(0.001, 0);
    let (x, y) = inputs(&mlp);
    let likelihood = Likelihood::Cosine {
        zero_norm: ZeroNorm::Zero,
    };
    let mut grad = vec![0.0_f32; mlp.num_weights()];

    c.bench_function("mlp_cosine_gradient_301_1000_300_batch16", |b| {
        b.iter(|| {
            let lp = mlp
                .logprob_gradient(black_box(&weights), &x, &y, likelihood, &mut grad)
                .unwrap();
            black_box(lp);
        })
    });
}

criterion_group!(benches, mlp_predict_bench, mlp_gradient_bench);
criterion_main!(benches);
