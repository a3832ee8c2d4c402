use neuragraph_core::{FloatT, NetworkConfig, Tensor};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn config(threads: usize, seed: u64) -> NetworkConfig {
    NetworkConfig::default().with_threads(threads).with_seed(seed)
}

/// `count` samples of `len` values uniform in `[-1, 1]`.
#[allow(dead_code)]
pub fn random_tensor(count: usize, len: usize, seed: u64) -> Tensor {
    let mut rng = StdRng::seed_from_u64(seed);
    let uniform = Uniform::new_inclusive(-1.0, 1.0);
    let data: Vec<FloatT> = (0..count * len).map(|_| uniform.sample(&mut rng)).collect();
    Tensor::from_vec(data, count, len).expect("random tensor dimensions")
}

/// Random XOR inputs with their class label (1 when the bits differ).
#[allow(dead_code)]
pub fn xor_samples(count: usize, seed: u64) -> (Tensor, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(count * 2);
    let mut labels = Vec::with_capacity(count);
    for _ in 0..count {
        let (a, b): (bool, bool) = (rng.gen(), rng.gen());
        data.push(FloatT::from(u8::from(a)));
        data.push(FloatT::from(u8::from(b)));
        labels.push(usize::from(a ^ b));
    }
    (
        Tensor::from_vec(data, count, 2).expect("xor tensor dimensions"),
        labels,
    )
}
