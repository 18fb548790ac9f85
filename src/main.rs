use log::info;
use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;

use neural_lemmatizer::lemmatizer::{
    CoarsePos, EmbeddingTable, GenConfig, LemmatizerConfig, NeuralLemmatizer, PosIndex,
    gen_dataset, train_lemmatizer,
};
use neural_lemmatizer::{Matrix, Split, TrainConfig, train_mlp};

fn tag(words: &[&str]) -> Vec<String> {
    words
        .iter()
        .map(|w| match *w {
            "the" | "a" => "DT",
            w if w.ends_with("ed") => "VBD",
            w if w.ends_with('s') => "NNS",
            _ => "NN",
        })
        .map(str::to_owned)
        .collect()
}

fn lemma(word: &str, pos: CoarsePos) -> String {
    match pos {
        CoarsePos::Verb => word.trim_end_matches("ed").to_owned(),
        CoarsePos::Noun => word.trim_end_matches('s').to_owned(),
        _ => word.to_owned(),
    }
}

fn main() -> neural_lemmatizer::Result<()> {
    env_logger::init();

    // 50 random (x, y) pairs, two hidden layers of 5.
    let mut rng = StdRng::seed_from_u64(0);
    let dist = Uniform::new(-1.0_f32, 1.0_f32);
    let xs: Vec<Vec<f32>> = (0..50)
        .map(|_| (0..3).map(|_| dist.sample(&mut rng)).collect())
        .collect();
    let ys: Vec<Vec<f32>> = (0..50)
        .map(|_| (0..2).map(|_| dist.sample(&mut rng)).collect())
        .collect();
    let cfg = TrainConfig {
        hidden_sizes: vec![5, 5],
        batch_size: 10,
        num_epochs: 5,
        seed: Some(0),
        split: Split::Seeded(0),
        ..TrainConfig::default()
    };
    let trained = train_mlp(&Matrix::from_rows(&xs)?, &Matrix::from_rows(&ys)?, &cfg, None)?;
    info!("synthetic run finished after {} epochs", trained.report.epochs.len());

    // Toy lemmatizer over a hand-made embedding space.
    let embeddings = EmbeddingTable::from_entries(
        3,
        [
            ("the", vec![0.1, 0.1, 0.1]),
            ("cat", vec![1.0, 0.0, 0.0]),
            ("cats", vec![0.9, 0.1, 0.0]),
            ("dog", vec![0.0, 1.0, 0.0]),
            ("dogs", vec![0.1, 0.9, 0.0]),
            ("walk", vec![0.0, 0.0, 1.0]),
            ("walked", vec![0.0, 0.1, 0.9]),
        ],
    )?;
    let sentences = vec![
        vec!["the", "cats", "walked"],
        vec!["the", "dogs", "walked"],
        vec!["the", "cat", "walk"],
        vec!["the", "dog", "walk"],
    ];
    let pos_index = PosIndex::penn_treebank();
    let gen_cfg = GenConfig {
        max_words: 4,
        train_test_split: None,
        ..GenConfig::default()
    };
    let data = gen_dataset(&sentences, &pos_index, &embeddings, &tag, &lemma, &gen_cfg)?;

    let lem_cfg = LemmatizerConfig::default();
    let lem_cfg = LemmatizerConfig {
        train: TrainConfig {
            hidden_sizes: vec![16],
            batch_size: 4,
            param_scale: 0.1,
            num_epochs: 50,
            step_size: 0.01,
            train_frac: 1.0,
            seed: Some(0),
            verbose: false,
            ..lem_cfg.train
        },
        ..lem_cfg
    };
    let trained = train_lemmatizer(&data.train.features, &data.train.targets, &lem_cfg)?;

    let lemmatizer =
        NeuralLemmatizer::new(trained.mlp, trained.weights, data.params, &embeddings, &tag)?;
    let sentence = ["the", "dogs", "walked"];
    println!("{:?} -> {:?}", sentence, lemmatizer.lemmatize(&sentence)?);
    Ok(())
}
