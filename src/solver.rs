use serde_derive::Serialize;
use std::f64::consts::PI;

/* 判別式をゼロとみなす相対許容誤差の既定値 */
pub const DEFAULT_DISCRIMINANT_EPSILON: f64 = 1e-12;

/* 三重根と判定する b^2 - 3ac の相対許容誤差 */
const TRIPLE_ROOT_TOLERANCE: f64 = 1e-10;

/* 重根の公式で得た根を採用する残差の相対許容誤差 */
const ROOT_CHECK_TOLERANCE: f64 = 1e-9;

/* ニュートン法による根の補正回数の上限 */
const POLISH_STEPS: usize = 8;

/* 解く対象の多項式。係数は次数の高い順 */
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Polynomial {
    Quadratic { a: f64, b: f64, c: f64 },
    Cubic { a: f64, b: f64, c: f64, d: f64 },
}

impl Polynomial {
    pub fn degree(&self) -> usize {
        match self {
            Polynomial::Quadratic { .. } => 2,
            Polynomial::Cubic { .. } => 3,
        }
    }

    pub fn coefficients(&self) -> Vec<f64> {
        match *self {
            Polynomial::Quadratic { a, b, c } => vec![a, b, c],
            Polynomial::Cubic { a, b, c, d } => vec![a, b, c, d],
        }
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.eval_with_derivative(x).0
    }

    /* ホーナー法で P(x) と P'(x) を同時に計算する */
    fn eval_with_derivative(&self, x: f64) -> (f64, f64) {
        let mut value = 0.0;
        let mut slope = 0.0;
        for coefficient in self.coefficients() {
            slope = slope * x + value;
            value = value * x + coefficient;
        }
        (value, slope)
    }

    /* sum |係数| |x|^k。残差の大きさを測る基準 */
    fn magnitude(&self, x: f64) -> f64 {
        self.coefficients()
            .iter()
            .rev()
            .enumerate()
            .map(|(power, coefficient)| coefficient.abs() * x.abs().powi(power as i32))
            .sum()
    }

    fn satisfied_by(&self, x: f64, tolerance: f64) -> bool {
        x.is_finite() && self.eval(x).abs() <= tolerance * self.magnitude(x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Root {
    pub value: f64,
    pub multiplicity: u8,
}

impl Root {
    pub fn new(value: f64, multiplicity: u8) -> Self {
        /* -0.0 を 0.0 に揃える */
        let value = if value == 0.0 { 0.0 } else { value };
        Root {
            value,
            multiplicity,
        }
    }

    pub fn simple(value: f64) -> Self {
        Root::new(value, 1)
    }
}

/* ソルバの出力。実数根は昇順で重複度付き */
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RootSet {
    NoRealRoots,
    /* 0 = 0 のように全ての x が解になる場合 */
    EveryX,
    Real(Vec<Root>),
}

impl RootSet {
    fn from_roots(mut roots: Vec<Root>) -> Self {
        roots.sort_by(|x, y| x.value.total_cmp(&y.value));
        RootSet::Real(roots)
    }

    /* 相異なる根の値 */
    pub fn values(&self) -> Vec<f64> {
        match self {
            RootSet::Real(roots) => roots.iter().map(|root| root.value).collect(),
            _ => Vec::new(),
        }
    }

    /* 重複度込みの根の個数 */
    pub fn total_multiplicity(&self) -> usize {
        match self {
            RootSet::Real(roots) => roots.iter().map(|root| root.multiplicity as usize).sum(),
            _ => 0,
        }
    }
}

/* 判別式の符号による分類。verbose ログ用 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Discriminant {
    Positive,
    Zero,
    Negative,
    /* 最高次係数が 0 で次数が落ちる */
    Degenerate,
}

/*
    元の係数による三次方程式の判別式
    D = 18abcd - 4b^3d + b^2c^2 - 4ac^3 - 27a^2d^2 と、各項の絶対値の最大値。
    D > 0 で相異なる3実根、D = 0 で重根、D < 0 で実根1つ
*/
fn cubic_discriminant(a: f64, b: f64, c: f64, d: f64) -> (f64, f64) {
    let terms = [
        18.0 * a * b * c * d,
        -4.0 * b * b * b * d,
        b * b * c * c,
        -4.0 * a * c * c * c,
        -27.0 * a * a * d * d,
    ];
    let scale = terms.iter().fold(0.0_f64, |max, term| max.max(term.abs()));
    (terms.iter().sum(), scale)
}

/* 変数変換 x = t - shift による被約三次方程式 t^3 + pt + q = 0 */
#[derive(Debug, Clone, Copy)]
struct Depressed {
    p: f64,
    q: f64,
    shift: f64,
    /* (q/2)^2 + (p/3)^3。桁落ちを避けるため -D / (108 a^4) から求める */
    discriminant: f64,
}

impl Depressed {
    fn new(a: f64, b: f64, c: f64, d: f64, cubic_discriminant: f64) -> Self {
        Depressed {
            p: (3.0 * a * c - b * b) / (3.0 * a * a),
            q: (2.0 * b * b * b - 9.0 * a * b * c + 27.0 * a * a * d) / (27.0 * a * a * a),
            shift: b / (3.0 * a),
            discriminant: -cubic_discriminant / (108.0 * a * a * a * a),
        }
    }

    /* カルダノの公式。絶対値の大きい方の立方根から求める */
    fn cardano(&self) -> f64 {
        let half_q = self.q / 2.0;
        let root = self.discriminant.max(0.0).sqrt();
        let u = (-half_q - root.copysign(half_q)).cbrt();
        let v = if u == 0.0 { 0.0 } else { -self.p / (3.0 * u) };
        u + v - self.shift
    }

    /* 三角関数による解法。p < 0 のときだけ使える */
    fn trigonometric(&self) -> [f64; 3] {
        let m = 2.0 * (-self.p / 3.0).sqrt();
        let theta = (3.0 * self.q / (self.p * m)).clamp(-1.0, 1.0).acos() / 3.0;
        [0.0, 1.0, 2.0].map(|k| m * (theta - 2.0 * PI * k / 3.0).cos() - self.shift)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solver {
    pub epsilon: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Solver {
            epsilon: DEFAULT_DISCRIMINANT_EPSILON,
        }
    }
}

impl Solver {
    pub fn new(epsilon: f64) -> Self {
        Solver { epsilon }
    }

    pub fn solve(&self, polynomial: &Polynomial) -> RootSet {
        match *polynomial {
            Polynomial::Quadratic { a, b, c } => self.quadratic(a, b, c),
            Polynomial::Cubic { a, b, c, d } => self.cubic(a, b, c, d),
        }
    }

    pub fn discriminant(&self, polynomial: &Polynomial) -> Discriminant {
        match *polynomial {
            Polynomial::Quadratic { a, b, c } => {
                if a == 0.0 {
                    return Discriminant::Degenerate;
                }
                self.classify(b * b - 4.0 * a * c, (b * b).max((4.0 * a * c).abs()))
            }
            Polynomial::Cubic { a, b, c, d } => {
                if a == 0.0 {
                    return Discriminant::Degenerate;
                }
                let (discriminant, scale) = cubic_discriminant(a, b, c, d);
                self.classify(discriminant, scale)
            }
        }
    }

    /* |value| <= epsilon * scale ならゼロとみなす */
    fn classify(&self, value: f64, scale: f64) -> Discriminant {
        if value.abs() <= self.epsilon * scale {
            Discriminant::Zero
        } else if value > 0.0 {
            Discriminant::Positive
        } else {
            Discriminant::Negative
        }
    }

    pub fn quadratic(&self, a: f64, b: f64, c: f64) -> RootSet {
        if a == 0.0 {
            return linear(b, c);
        }

        let discriminant = b * b - 4.0 * a * c;
        match self.classify(discriminant, (b * b).max((4.0 * a * c).abs())) {
            Discriminant::Positive => {
                /* 桁落ちを避けるため、絶対値の大きい方の根から求める */
                let q = -0.5 * (b + discriminant.sqrt().copysign(b));
                RootSet::from_roots(vec![Root::simple(q / a), Root::simple(c / q)])
            }
            Discriminant::Zero => RootSet::Real(vec![Root::new(-b / (2.0 * a), 2)]),
            _ => RootSet::NoRealRoots,
        }
    }

    pub fn cubic(&self, a: f64, b: f64, c: f64, d: f64) -> RootSet {
        if a == 0.0 {
            return self.quadratic(b, c, d);
        }

        let polynomial = Polynomial::Cubic { a, b, c, d };
        let (discriminant, scale) = cubic_discriminant(a, b, c, d);
        let depressed = Depressed::new(a, b, c, d, discriminant);

        let roots = match self.classify(discriminant, scale) {
            Discriminant::Positive if depressed.p < 0.0 => {
                self.three_distinct(&polynomial, &depressed)
            }
            /* 実数根1つと共役複素数根 */
            Discriminant::Positive | Discriminant::Negative => {
                vec![Root::simple(polish(&polynomial, depressed.cardano()))]
            }
            /* 重根を含む。公式の根が式を満たさなければ符号どおりの解法に戻す */
            _ => match repeated_roots(&polynomial) {
                Some(roots) => roots,
                None if discriminant > 0.0 && depressed.p < 0.0 => {
                    self.three_distinct(&polynomial, &depressed)
                }
                None => vec![Root::simple(polish(&polynomial, depressed.cardano()))],
            },
        };
        RootSet::from_roots(roots)
    }

    /*
        相異なる3実根。三角関数解のうち絶対値最大の根だけを使い、
        残りは後退除算で得た二次式から求める
    */
    fn three_distinct(&self, polynomial: &Polynomial, depressed: &Depressed) -> Vec<Root> {
        let candidates = depressed.trigonometric();
        let fallback = || {
            candidates
                .iter()
                .map(|&x| Root::simple(polish(polynomial, x)))
                .collect::<Vec<_>>()
        };

        let Polynomial::Cubic { a, c, d, .. } = *polynomial else {
            return fallback();
        };
        let largest = candidates
            .iter()
            .copied()
            .fold(0.0_f64, |max, x| if x.abs() > max.abs() { x } else { max });
        let largest = polish(polynomial, largest);
        if largest == 0.0 {
            return fallback();
        }

        /* P(x) = (x - r)(a x^2 + q1 x + q0) */
        let q0 = -d / largest;
        let q1 = (q0 - c) / largest;
        match self.quadratic(a, q1, q0) {
            RootSet::Real(rest) if rest.iter().map(|r| r.multiplicity).sum::<u8>() == 2 => {
                let mut roots = vec![Root::simple(largest)];
                roots.extend(rest.into_iter().map(|root| {
                    if root.multiplicity == 1 {
                        Root::simple(polish(polynomial, root.value))
                    } else {
                        root
                    }
                }));
                roots
            }
            _ => fallback(),
        }
    }
}

/*
    D = 0 のときの閉じた形。d0 = b^2 - 3ac として
    d0 = 0 なら三重根 -b/(3a)、そうでなければ
    二重根 (9ad - bc) / (2 d0) と単根 (4abc - 9a^2d - b^3) / (a d0)
*/
fn repeated_roots(polynomial: &Polynomial) -> Option<Vec<Root>> {
    let Polynomial::Cubic { a, b, c, d } = *polynomial else {
        return None;
    };

    let d0 = b * b - 3.0 * a * c;
    let roots = if d0.abs() <= TRIPLE_ROOT_TOLERANCE * (b * b).max((3.0 * a * c).abs()) {
        vec![Root::new(-b / (3.0 * a), 3)]
    } else {
        let double = (9.0 * a * d - b * c) / (2.0 * d0);
        let simple = (4.0 * a * b * c - 9.0 * a * a * d - b * b * b) / (a * d0);
        vec![
            Root::simple(polish(polynomial, simple)),
            Root::new(double, 2),
        ]
    };

    roots
        .iter()
        .all(|root| polynomial.satisfied_by(root.value, ROOT_CHECK_TOLERANCE))
        .then_some(roots)
}

/* b x + c = 0 */
fn linear(b: f64, c: f64) -> RootSet {
    if b != 0.0 {
        RootSet::Real(vec![Root::simple(-c / b)])
    } else if c != 0.0 {
        RootSet::NoRealRoots
    } else {
        RootSet::EveryX
    }
}

/* ニュートン法で根を補正する。残差が悪化する一歩は採用しない */
fn polish(polynomial: &Polynomial, root: f64) -> f64 {
    let mut x = root;
    for _ in 0..POLISH_STEPS {
        let (value, slope) = polynomial.eval_with_derivative(x);
        if value == 0.0 || slope == 0.0 {
            break;
        }
        let next = x - value / slope;
        if !next.is_finite() || polynomial.eval(next).abs() >= value.abs() {
            break;
        }
        x = next;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn residual_bound(polynomial: &Polynomial, x: f64) -> f64 {
        1e-9 * polynomial.magnitude(x) + 1e-12
    }

    /* 符号付きで 10^-3 .. 10^3 に対数一様に散らした係数 */
    fn spread_coefficient(rng: &mut StdRng) -> f64 {
        let magnitude = 10f64.powf(rng.gen_range(-3.0..3.0));
        if rng.gen_bool(0.5) {
            magnitude
        } else {
            -magnitude
        }
    }

    fn assert_roots_satisfy(polynomial: &Polynomial, roots: &RootSet) {
        for x in roots.values() {
            let value = polynomial.eval(x);
            assert!(
                value.abs() <= residual_bound(polynomial, x),
                "P({x}) = {value} for {polynomial:?}"
            );
        }
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (x, y) in actual.iter().zip(expected) {
            assert!((x - y).abs() < 1e-9, "{actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn quadratic_with_two_roots() {
        let roots = Solver::default().quadratic(1.0, -3.0, 2.0);
        assert_close(&roots.values(), &[1.0, 2.0]);
        assert_eq!(roots.total_multiplicity(), 2);
    }

    #[test]
    fn quadratic_without_real_roots() {
        assert_eq!(Solver::default().quadratic(1.0, 2.0, 5.0), RootSet::NoRealRoots);
    }

    #[test]
    fn quadratic_with_double_root() {
        let roots = Solver::default().quadratic(1.0, -4.0, 4.0);
        assert_eq!(roots, RootSet::Real(vec![Root::new(2.0, 2)]));
    }

    #[test]
    fn quadratic_with_zero_constant() {
        let roots = Solver::default().quadratic(2.0, -6.0, 0.0);
        assert_close(&roots.values(), &[0.0, 3.0]);
    }

    #[test]
    fn zero_leading_coefficient_reduces_degree() {
        let solver = Solver::default();
        assert_eq!(solver.quadratic(0.0, 2.0, -4.0), RootSet::Real(vec![Root::simple(2.0)]));
        assert_eq!(solver.quadratic(0.0, 0.0, 1.0), RootSet::NoRealRoots);
        assert_eq!(solver.quadratic(0.0, 0.0, 0.0), RootSet::EveryX);
        assert_close(&solver.cubic(0.0, 1.0, -3.0, 2.0).values(), &[1.0, 2.0]);
        assert_eq!(
            solver.discriminant(&Polynomial::Cubic { a: 0.0, b: 1.0, c: 0.0, d: 0.0 }),
            Discriminant::Degenerate
        );
    }

    #[test]
    fn cubic_with_one_real_root() {
        let roots = Solver::default().cubic(1.0, 0.0, 0.0, -8.0);
        assert_close(&roots.values(), &[2.0]);
        assert_eq!(roots.total_multiplicity(), 1);
    }

    #[test]
    fn cubic_with_three_distinct_roots() {
        /* (x - 1)(x - 2)(x - 3) */
        let roots = Solver::default().cubic(1.0, -6.0, 11.0, -6.0);
        assert_close(&roots.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(roots.total_multiplicity(), 3);
    }

    #[test]
    fn cubic_with_double_root() {
        /* (x - 1)^2 (x - 2) */
        let solver = Solver::default();
        let polynomial = Polynomial::Cubic { a: 1.0, b: -4.0, c: 5.0, d: -2.0 };
        assert_eq!(solver.discriminant(&polynomial), Discriminant::Zero);
        match solver.solve(&polynomial) {
            RootSet::Real(roots) => {
                assert_eq!(roots.len(), 2);
                assert!((roots[0].value - 1.0).abs() < 1e-9);
                assert_eq!(roots[0].multiplicity, 2);
                assert!((roots[1].value - 2.0).abs() < 1e-9);
                assert_eq!(roots[1].multiplicity, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cubic_with_triple_root() {
        /* 2 (x + 1)^3 */
        let roots = Solver::default().cubic(2.0, 6.0, 6.0, 2.0);
        assert_eq!(roots, RootSet::Real(vec![Root::new(-1.0, 3)]));
    }

    #[test]
    fn random_quadratics_satisfy_their_classification() {
        let solver = Solver::default();
        let mut rng = StdRng::seed_from_u64(5555);
        for _ in 0..2000 {
            let a = rng.gen_range(-10.0..10.0);
            let b = rng.gen_range(-10.0..10.0);
            let c = rng.gen_range(-10.0..10.0);
            if a == 0.0 {
                continue;
            }
            let polynomial = Polynomial::Quadratic { a, b, c };
            let roots = solver.solve(&polynomial);
            match solver.discriminant(&polynomial) {
                Discriminant::Positive => {
                    assert_eq!(roots.values().len(), 2);
                    assert_roots_satisfy(&polynomial, &roots);
                }
                Discriminant::Zero => assert_eq!(roots.values().len(), 1),
                Discriminant::Negative => assert_eq!(roots, RootSet::NoRealRoots),
                Discriminant::Degenerate => unreachable!(),
            }
        }
    }

    #[test]
    fn random_perfect_squares_give_one_root() {
        let solver = Solver::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let k = rng.gen_range(1..=9) as f64;
            let r = rng.gen_range(-20..=20) as f64;
            /* k (x - r)^2 */
            let roots = solver.quadratic(k, -2.0 * k * r, k * r * r);
            assert_eq!(roots, RootSet::Real(vec![Root::new(r, 2)]));
        }
    }

    #[test]
    fn random_cubics_have_one_or_three_roots() {
        let solver = Solver::default();
        let mut rng = StdRng::seed_from_u64(2023);
        for _ in 0..2000 {
            let a = rng.gen_range(-10.0..10.0);
            if a == 0.0 {
                continue;
            }
            let polynomial = Polynomial::Cubic {
                a,
                b: rng.gen_range(-10.0..10.0),
                c: rng.gen_range(-10.0..10.0),
                d: rng.gen_range(-10.0..10.0),
            };
            let roots = solver.solve(&polynomial);
            let count = roots.total_multiplicity();
            assert!(count == 1 || count == 3, "{count} roots for {polynomial:?}");
            assert_roots_satisfy(&polynomial, &roots);
        }
    }

    #[test]
    fn cubics_with_widely_spread_coefficients() {
        let solver = Solver::default();
        let mut rng = StdRng::seed_from_u64(5555);
        for _ in 0..2000 {
            let polynomial = Polynomial::Cubic {
                a: spread_coefficient(&mut rng),
                b: spread_coefficient(&mut rng),
                c: spread_coefficient(&mut rng),
                d: spread_coefficient(&mut rng),
            };
            let roots = solver.solve(&polynomial);
            let count = roots.total_multiplicity();
            assert!(count == 1 || count == 3, "{count} roots for {polynomial:?}");
            assert_roots_satisfy(&polynomial, &roots);
        }
    }

    #[test]
    fn large_quadratic_term_leaves_one_real_root() {
        /* 残りの2根は複素数 */
        let solver = Solver::default();
        let polynomial = Polynomial::Cubic { a: 1.0, b: 1e6, c: 1.0, d: 1.0 };
        assert_eq!(solver.discriminant(&polynomial), Discriminant::Negative);

        let roots = solver.solve(&polynomial);
        assert_eq!(roots.total_multiplicity(), 1);
        assert!((roots.values()[0] + 999_999.999_999).abs() < 1e-6, "{roots:?}");
        assert_roots_satisfy(&polynomial, &roots);
    }

    #[test]
    fn tiny_leading_coefficient_keeps_small_roots() {
        /* 根はおよそ -1e10, 1, 2 */
        let solver = Solver::default();
        let polynomial = Polynomial::Cubic { a: 1e-10, b: 1.0, c: -3.0, d: 2.0 };
        assert_eq!(solver.discriminant(&polynomial), Discriminant::Positive);

        let roots = solver.solve(&polynomial);
        let values = roots.values();
        assert_eq!(roots.total_multiplicity(), 3, "{roots:?}");
        assert!(values[0] < -9.9e9, "{roots:?}");
        assert!((values[1] - 1.0).abs() < 1e-6, "{roots:?}");
        assert!((values[2] - 2.0).abs() < 1e-6, "{roots:?}");
        assert_roots_satisfy(&polynomial, &roots);
    }

    #[test]
    fn close_double_root_is_not_dropped() {
        /* (x - 1)^2 (x - 1.0003) */
        let solver = Solver::default();
        let polynomial = Polynomial::Cubic { a: 1.0, b: -3.0003, c: 3.0006, d: -1.0003 };
        assert_eq!(solver.discriminant(&polynomial), Discriminant::Zero);

        match solver.solve(&polynomial) {
            RootSet::Real(roots) => {
                assert_eq!(roots.len(), 2, "{roots:?}");
                assert!((roots[0].value - 1.0).abs() < 1e-6, "{roots:?}");
                assert_eq!(roots[0].multiplicity, 2);
                assert!((roots[1].value - 1.0003).abs() < 1e-6, "{roots:?}");
                assert_eq!(roots[1].multiplicity, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn repeated_root_formula_is_checked_against_the_polynomial() {
        /* x^3 - 1 に三重根の公式を当てると 0 になるが、式を満たさない */
        let polynomial = Polynomial::Cubic { a: 1.0, b: 0.0, c: 0.0, d: -1.0 };
        assert_eq!(repeated_roots(&polynomial), None);

        let roots = Solver::default().solve(&polynomial);
        assert_eq!(roots.total_multiplicity(), 1);
        assert!((roots.values()[0] - 1.0).abs() < 1e-12, "{roots:?}");
    }

    #[test]
    fn random_integer_cubics_recover_their_roots() {
        let solver = Solver::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let mut expected: Vec<f64> = (0..3).map(|_| rng.gen_range(-9..=9) as f64).collect();
            expected.sort_by(f64::total_cmp);
            let [r1, r2, r3] = [expected[0], expected[1], expected[2]];
            let roots = solver.cubic(
                1.0,
                -(r1 + r2 + r3),
                r1 * r2 + r1 * r3 + r2 * r3,
                -(r1 * r2 * r3),
            );
            assert_eq!(roots.total_multiplicity(), 3, "{expected:?} -> {roots:?}");
            let mut found = Vec::new();
            if let RootSet::Real(roots) = &roots {
                for root in roots {
                    for _ in 0..root.multiplicity {
                        found.push(root.value);
                    }
                }
            }
            for (x, y) in found.iter().zip(&expected) {
                assert!((x - y).abs() < 1e-6, "{expected:?} -> {found:?}");
            }
        }
    }
}
