#[macro_use]
extern crate log;

use std::time::Instant;

use common::{CandidateModel, FeatureLoader};
use dialoguer::{theme::ColorfulTheme, Select};
use feature_loaders::{
    make_gaussian_mass, PcaParams, PcaReducingLoader, PoolingParams, PrfPoolingLoader,
};
use fwrf::{r2, shared_unique_var, validate, FitConfig, GridSearch};
use lin_reg::{logspace, TikhonovRegularization};
use nalgebra::DMatrix;
use nanorand::{Rng, WyRand};

const N_PIX: usize = 12;
const N_CHANNELS: usize = 4;
const N_TRIALS: usize = 400;
const N_VAL: usize = 100;
const N_VOXELS: usize = 40;
const APERTURE: f64 = 1.0;
const SEED: Option<u64> = Some(0);

type Images = Vec<Vec<DMatrix<f64>>>;

pub(crate) fn main() {
    pretty_env_logger::init();

    let mut rng = WyRand::new_seed(SEED.unwrap_or(0));
    let models = CandidateModel::polar_grid(&[0.0, 0.15, 0.3], 8, &[0.05, 0.1, 0.2]);
    info!("got {} candidate models", models.len());

    let images = random_maps(&mut rng, N_TRIALS + N_VAL);
    let truth: Vec<(usize, Vec<f64>)> = (0..N_VOXELS)
        .map(|_| {
            let m = rng.generate_range(0..models.len());
            let w = (0..N_CHANNELS).map(|_| rng.generate::<f64>() * 2.0 - 1.0).collect();
            (m, w)
        })
        .collect();
    let responses = simulate_voxels(&mut rng, &images, &models, &truth);
    info!("simulated {} voxels over {} trials", N_VOXELS, images.len());

    let (fit_images, val_images) = images.split_at(N_TRIALS);
    let fit_data = responses.rows(0, N_TRIALS).into_owned();
    let val_data = responses.rows(N_TRIALS, N_VAL).into_owned();

    let pooling = PoolingParams {
        n_channels: N_CHANNELS,
        aperture: APERTURE,
        channel_groups: vec![("low".to_string(), vec![0, 1]), ("high".to_string(), vec![2, 3])],
    };
    let loaders = vec!["pRF pooling", "pRF pooling + PCA"];
    let e = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select feature loader")
        .items(&loaders)
        .default(0)
        .interact()
        .unwrap();
    match e {
        0 => {
            let mut loader = PrfPoolingLoader::new(pooling).unwrap();
            run(&mut loader, fit_images, val_images, &fit_data, &val_data, &models, &truth);
        }
        1 => {
            let inner = PrfPoolingLoader::new(pooling).unwrap();
            let params = PcaParams {
                max_components: N_CHANNELS,
                min_pct_var: 95.0,
            };
            let mut loader = PcaReducingLoader::new(inner, params).unwrap();
            run(&mut loader, fit_images, val_images, &fit_data, &val_data, &models, &truth);
        }
        _ => panic!("invalid selection"),
    }
}

/// Feature maps with independent uniform pixels
fn random_maps(rng: &mut WyRand, n_trials: usize) -> Images {
    (0..n_trials)
        .map(|_| {
            (0..N_CHANNELS)
                .map(|_| DMatrix::from_fn(N_PIX, N_PIX, |_, _| rng.generate::<f64>()))
                .collect()
        })
        .collect()
}

/// Responses of voxels that pool each channel with their true pRF, plus noise
fn simulate_voxels(
    rng: &mut WyRand,
    images: &Images,
    models: &[CandidateModel],
    truth: &[(usize, Vec<f64>)],
) -> DMatrix<f64> {
    let mut data = DMatrix::zeros(images.len(), truth.len());
    for (v, (m, w)) in truth.iter().enumerate() {
        let model = models[*m];
        let prf: DMatrix<f64> =
            make_gaussian_mass(model.x, model.y, model.sigma, N_PIX, APERTURE).unwrap();
        for (t, channels) in images.iter().enumerate() {
            let signal: f64 = channels.iter().zip(w.iter()).map(|(map, w)| map.dot(&prf) * w).sum();
            data[(t, v)] = signal + 0.02 * (rng.generate::<f64>() - 0.5);
        }
    }
    data
}

fn run<L>(
    loader: &mut L,
    fit_images: &[Vec<DMatrix<f64>>],
    val_images: &[Vec<DMatrix<f64>>],
    fit_data: &DMatrix<f64>,
    val_data: &DMatrix<f64>,
    models: &[CandidateModel],
    truth: &[(usize, Vec<f64>)],
) where
    L: FeatureLoader<f64, Images = [Vec<DMatrix<f64>>]>,
{
    let config = FitConfig {
        zscore: true,
        add_bias: true,
        voxel_batch_size: 16,
        holdout_size: 80,
        seed: SEED,
        ..Default::default()
    };
    let regressor = TikhonovRegularization::new(logspace(-3.0, 2.0, 6)).unwrap();
    let search = GridSearch::new(regressor, config);

    let t0 = Instant::now();
    let fit = search.fit(fit_images, fit_data, loader, models).unwrap();
    info!("fitting done in: {}ms", t0.elapsed().as_millis());

    let full = fit.best.version(0);
    let recovered = truth
        .iter()
        .zip(full.model_index.iter())
        .filter(|((m, _), best)| **best == Some(*m))
        .count();
    info!("recovered the true pRF of {} of {} voxels", recovered, truth.len());

    let held_out = fit_data.select_rows(fit.held_out_trials().iter());
    let held_out_r2 = r2(&held_out, &full.held_out_pred).unwrap();
    info!("mean held-out r2: {:.3}", mean(&held_out_r2));

    let val = validate(val_images, val_data, loader, &fit).unwrap();
    for (v, name) in fit.version_names().iter().enumerate() {
        let cc: Vec<f64> = val.val_cc.column(v).iter().copied().collect();
        let r: Vec<f64> = val.val_r2.column(v).iter().copied().collect();
        info!("{}: mean val_cc {:.3}, mean val_r2 {:.3}", name, mean(&cc), mean(&r));
    }

    if fit.best.n_versions() == 3 {
        let column = |v: usize| val.val_r2.column(v).iter().copied().collect::<Vec<f64>>();
        let parts = shared_unique_var(&column(0), &column(1), &column(2)).unwrap();
        info!(
            "variance partition: shared {:.3}, unique low {:.3}, unique high {:.3}",
            mean(&parts.shared),
            mean(&parts.unique_a),
            mean(&parts.unique_b)
        );
    }
}

fn mean(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.iter().sum::<f64>() / finite.len() as f64
}
