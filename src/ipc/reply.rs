/*
    返信テキストの組み立て。

    reply := "no real roots" | "every x is a root"
           | "roots: " root ("; " root)* " | factors: " factorization
    root  := 数値 [" (x" 重複度 ")"]

    因数分解は最高次係数 (1 のときは省略) と (x - r)^m の積で、
    複素数根が残る三次方程式では既約な二次因子 (x^2 + ux + v) を末尾に付ける。
*/
use crate::ipc::FRACTION_DIGITS;
use crate::solver::{Polynomial, Root, RootSet};

pub const NO_REAL_ROOTS: &str = "no real roots";
pub const EVERY_X: &str = "every x is a root";

pub fn format_reply(polynomial: &Polynomial, roots: &RootSet) -> String {
    match roots {
        RootSet::NoRealRoots => NO_REAL_ROOTS.to_string(),
        RootSet::EveryX => EVERY_X.to_string(),
        RootSet::Real(roots) => format!(
            "roots: {} | factors: {}",
            roots.iter().map(format_root).collect::<Vec<_>>().join("; "),
            factorization(polynomial, roots)
        ),
    }
}

fn number(x: f64) -> String {
    format!("{:.*}", FRACTION_DIGITS, x)
}

fn format_root(root: &Root) -> String {
    if root.multiplicity > 1 {
        format!("{} (x{})", number(root.value), root.multiplicity)
    } else {
        number(root.value)
    }
}

/* "+ 1.5" / "- 1.5" の形 */
fn signed(x: f64) -> String {
    if x < 0.0 {
        format!("- {}", number(-x))
    } else {
        format!("+ {}", number(x))
    }
}

fn factorization(polynomial: &Polynomial, roots: &[Root]) -> String {
    /* 最高次係数が 0 の場合は次数を落とした多項式として扱う */
    let coefficients: Vec<f64> = polynomial
        .coefficients()
        .into_iter()
        .skip_while(|coefficient| *coefficient == 0.0)
        .collect();
    let leading = coefficients.first().copied().unwrap_or(0.0);
    let degree = coefficients.len().saturating_sub(1);

    let mut out = String::new();
    if leading == -1.0 {
        out.push('-');
    } else if leading != 1.0 {
        out.push_str(&number(leading));
    }

    let mut found = 0;
    for root in roots {
        if root.value == 0.0 {
            out.push('x');
        } else {
            out.push_str(&format!("(x {})", signed(-root.value)));
        }
        if root.multiplicity > 1 {
            out.push_str(&format!("^{}", root.multiplicity));
        }
        found += root.multiplicity as usize;
    }

    /* 三次で実数根が1つだけ: 組立除法で残りの二次因子を求める */
    if degree == 3 && found == 1 {
        let r = roots[0].value;
        let q1 = coefficients[1] + r * coefficients[0];
        let q2 = coefficients[2] + r * q1;
        out.push_str(&format!(
            "(x^2 {}x {})",
            signed(q1 / leading),
            signed(q2 / leading)
        ));
    }

    out
}
