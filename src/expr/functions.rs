use super::{EvalError, Result};
use fastnoise_lite::{FastNoiseLite, NoiseType};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoiseKind {
    Perlin,
    Simplex,
    Cellular,
    Value,
}

impl NoiseKind {
    const ALL: [NoiseKind; 4] = [
        NoiseKind::Perlin,
        NoiseKind::Simplex,
        NoiseKind::Cellular,
        NoiseKind::Value,
    ];

    fn function_name(&self) -> &'static str {
        match self {
            NoiseKind::Perlin => "perlin",
            NoiseKind::Simplex => "simplex",
            NoiseKind::Cellular => "cellular",
            NoiseKind::Value => "value",
        }
    }

    fn noise_type(&self) -> NoiseType {
        match self {
            NoiseKind::Perlin => NoiseType::Perlin,
            NoiseKind::Simplex => NoiseType::OpenSimplex2,
            NoiseKind::Cellular => NoiseType::Cellular,
            NoiseKind::Value => NoiseType::Value,
        }
    }
}

type CustomFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Function table available to expressions: math built-ins, seeded noise
/// and host-registered functions. Registered names shadow built-ins.
pub struct EvalFunctions {
    seed: i32,
    noises: [(NoiseKind, FastNoiseLite); 4],
    custom: FxHashMap<SmolStr, CustomFn>,
}

impl fmt::Debug for EvalFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalFunctions")
            .field("seed", &self.seed)
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Clone for EvalFunctions {
    fn clone(&self) -> Self {
        let mut funcs = EvalFunctions::with_seed(self.seed);
        funcs.custom = self.custom.clone();
        funcs
    }
}

impl Default for EvalFunctions {
    fn default() -> Self {
        Self::with_seed(1337)
    }
}

fn make_noise(kind: NoiseKind, seed: i32) -> FastNoiseLite {
    let mut noise = FastNoiseLite::with_seed(seed);
    noise.set_noise_type(Some(kind.noise_type()));
    // Callers scale coordinates themselves.
    noise.set_frequency(Some(1.0));
    noise
}

fn expect_args(name: &str, args: &[f64], expected: &'static str, ok: bool) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(EvalError::Arity {
            name: name.to_string(),
            expected,
            found: args.len(),
        })
    }
}

impl EvalFunctions {
    pub fn with_seed(seed: i32) -> Self {
        EvalFunctions {
            seed,
            noises: NoiseKind::ALL.map(|k| (k, make_noise(k, seed))),
            custom: FxHashMap::default(),
        }
    }

    pub fn seed(&self) -> i32 {
        self.seed
    }

    pub fn register(
        &mut self,
        name: &str,
        f: impl Fn(&[f64]) -> f64 + Send + Sync + 'static,
    ) {
        self.custom.insert(SmolStr::new(name), Arc::new(f));
    }

    /// Noise in roughly -1..1; a 2-D sample uses `(a, b)`, a 3-D one `(a, b, c)`.
    pub fn noise(&self, kind: NoiseKind, args: &[f64]) -> Option<f64> {
        let (_, noise) = self.noises.iter().find(|(k, _)| *k == kind)?;
        match *args {
            [a, b] => Some(noise.get_noise_2d(a as f32, b as f32) as f64),
            [a, b, c] => Some(noise.get_noise_3d(a as f32, b as f32, c as f32) as f64),
            _ => None,
        }
    }

    pub fn call(&self, name: &str, args: &[f64]) -> Result<f64> {
        if let Some(f) = self.custom.get(name) {
            return Ok(f(args));
        }
        if let Some(kind) = NoiseKind::ALL.into_iter().find(|k| k.function_name() == name) {
            return self.noise(kind, args).ok_or_else(|| EvalError::Arity {
                name: name.to_string(),
                expected: "2 or 3",
                found: args.len(),
            });
        }

        let unary = |f: fn(f64) -> f64| -> Result<f64> {
            expect_args(name, args, "1", args.len() == 1)?;
            Ok(f(args[0]))
        };
        let binary = |f: fn(f64, f64) -> f64| -> Result<f64> {
            expect_args(name, args, "2", args.len() == 2)?;
            Ok(f(args[0], args[1]))
        };
        match name {
            "sin" => unary(f64::sin),
            "cos" => unary(f64::cos),
            "tan" => unary(f64::tan),
            "asin" => unary(f64::asin),
            "acos" => unary(f64::acos),
            "atan" => unary(f64::atan),
            "sqrt" => unary(f64::sqrt),
            "abs" => unary(f64::abs),
            "floor" => unary(f64::floor),
            "ceil" => unary(f64::ceil),
            "round" => unary(f64::round),
            "exp" => unary(f64::exp),
            "log" => unary(f64::ln),
            "atan2" => binary(f64::atan2),
            "pow" => binary(f64::powf),
            "min" | "max" => {
                expect_args(name, args, "at least 1", !args.is_empty())?;
                let pick = if name == "min" { f64::min } else { f64::max };
                Ok(args[1..].iter().fold(args[0], |acc, v| pick(acc, *v)))
            }
            "clamp" => {
                expect_args(name, args, "3", args.len() == 3)?;
                Ok(args[0].max(args[1]).min(args[2]))
            }
            _ => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let f = EvalFunctions::default();
        assert_eq!(f.call("abs", &[-2.0]).unwrap(), 2.0);
        assert_eq!(f.call("max", &[1.0, 5.0, 3.0]).unwrap(), 5.0);
        assert_eq!(f.call("clamp", &[9.0, 0.0, 4.0]).unwrap(), 4.0);
        assert!(matches!(f.call("sqrt", &[]), Err(EvalError::Arity { .. })));
        assert!(matches!(f.call("nope", &[1.0]), Err(EvalError::UnknownFunction(_))));
    }

    #[test]
    fn test_noise_is_seeded_and_bounded() {
        let a = EvalFunctions::with_seed(7);
        let b = EvalFunctions::with_seed(7);
        for i in 0..50 {
            let p = [i as f64 * 0.37, i as f64 * 0.11, 3.5];
            let va = a.call("perlin", &p).unwrap();
            assert_eq!(va, b.call("perlin", &p).unwrap());
            assert!((-1.5..=1.5).contains(&va));
            assert!(a.call("simplex", &p[..2]).is_ok());
        }
        assert!(a.call("cellular", &[1.0]).is_err());
    }

    #[test]
    fn test_custom_shadows_builtin() {
        let mut f = EvalFunctions::default();
        f.register("abs", |_| 42.0);
        f.register("sum", |args| args.iter().sum());
        assert_eq!(f.call("abs", &[-1.0]).unwrap(), 42.0);
        assert_eq!(f.call("sum", &[1.0, 2.0, 3.0]).unwrap(), 6.0);
    }
}
