use super::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_xavier_stays_within_bound() -> Result<(), NeuraGraphError> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut values = vec![0.0; 200];
    WeightInit::xavier().fill(&mut values, 10, 20, &mut rng)?;
    let bound = (6.0 / 30.0 as FloatT).sqrt();
    assert!(values.iter().all(|v| v.abs() <= bound));
    assert!(values.iter().any(|v| *v != 0.0));
    Ok(())
}

#[test]
fn test_lecun_bound_uses_fan_in() -> Result<(), NeuraGraphError> {
    let mut rng = StdRng::seed_from_u64(1);
    let mut values = vec![0.0; 100];
    WeightInit::lecun().fill(&mut values, 16, 3, &mut rng)?;
    assert!(values.iter().all(|v| v.abs() <= 0.25));
    Ok(())
}

#[test]
fn test_constant_fill() -> Result<(), NeuraGraphError> {
    let mut rng = StdRng::seed_from_u64(0);
    let mut values = vec![1.0; 4];
    WeightInit::constant(0.5).fill(&mut values, 0, 0, &mut rng)?;
    assert_eq!(values, vec![0.5; 4]);
    Ok(())
}

#[test]
fn test_same_seed_same_values() -> Result<(), NeuraGraphError> {
    let mut a = vec![0.0; 32];
    let mut b = vec![0.0; 32];
    WeightInit::he().fill(&mut a, 8, 8, &mut StdRng::seed_from_u64(42))?;
    WeightInit::he().fill(&mut b, 8, 8, &mut StdRng::seed_from_u64(42))?;
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn test_invalid_settings_are_rejected() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut values = vec![0.0; 4];
    assert!(WeightInit::xavier().fill(&mut values, 0, 0, &mut rng).is_err());
    assert!(WeightInit::he().fill(&mut values, 0, 4, &mut rng).is_err());
    assert!(WeightInit::gaussian(-1.0)
        .fill(&mut values, 2, 2, &mut rng)
        .is_err());
}

#[test]
fn test_serde_tagging() {
    let json = serde_json::to_string(&WeightInit::xavier()).unwrap();
    assert!(json.contains("\"kind\":\"xavier\""));
    let back: WeightInit = serde_json::from_str(&json).unwrap();
    assert_eq!(back, WeightInit::xavier());
}
