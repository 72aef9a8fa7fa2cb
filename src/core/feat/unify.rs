use core::feat::{Bindings, FeatureStructure, Value};

/// Merges two feature structures under `env`, or fails.
///
/// With `rename_vars` set, every variable in `b` is renamed with a suffix
/// fresh for this environment before unification, so structures originating
/// in independent derivations can never capture each other's variables.
///
/// On failure the caller's environment is untouched; on success the merged
/// structure is returned with every currently-resolvable binding already
/// substituted, alongside the extended environment.
pub fn unify(
    a: &FeatureStructure,
    b: &FeatureStructure,
    env: &Bindings,
    rename_vars: bool,
) -> Option<(FeatureStructure, Bindings)> {
    let mut env = env.clone();

    let b = if rename_vars {
        let suffix = env.fresh_suffix();
        rename_fs(b, suffix)
    } else {
        b.clone()
    };

    let merged = unify_fs(a, &b, &mut env)?;
    let merged = merged.substitute(&env);
    Some((merged, env))
}

fn rename_fs(fs: &FeatureStructure, suffix: usize) -> FeatureStructure {
    let mut renamed = FeatureStructure::new();
    for (key, value) in fs.attributes() {
        renamed = renamed.attr(key, rename_value(value, suffix));
    }
    renamed
}

fn rename_value(value: &Value, suffix: usize) -> Value {
    match value {
        Value::Atom(_) => value.clone(),
        Value::Var(ref name) => Value::Var(format!("{}~{}", name, suffix)),
        Value::Structure(ref fs) => Value::Structure(rename_fs(fs, suffix)),
        Value::Disj(ref alts) => {
            Value::Disj(alts.iter().map(|alt| rename_value(alt, suffix)).collect())
        }
        Value::Conj(ref parts) => Value::Conj(
            parts
                .iter()
                .map(|part| rename_value(part, suffix))
                .collect(),
        ),
    }
}

fn unify_fs(
    a: &FeatureStructure,
    b: &FeatureStructure,
    env: &mut Bindings,
) -> Option<FeatureStructure> {
    // Cheap discriminator: structures of different categories never unify.
    if let (Some(ta), Some(tb)) = (a.typ(), b.typ()) {
        if ta != tb {
            return None;
        }
    }

    let mut merged = a.clone();

    for (key, b_value) in b.attributes() {
        let value = match a.get(key) {
            Some(a_value) => unify_value(a_value, b_value, env)?,
            None => b_value.clone(),
        };
        merged = merged.attr(key, value);
    }

    Some(merged)
}

fn unify_value(x: &Value, y: &Value, env: &mut Bindings) -> Option<Value> {
    let x = env.walk(x);
    let y = env.walk(y);

    match (&x, &y) {
        (&Value::Var(ref v1), &Value::Var(ref v2)) => {
            if v1 != v2 {
                env.bind(v1, Value::Var(v2.clone()));
            }
            Some(Value::Var(v2.clone()))
        }
        (&Value::Var(ref var), other) => {
            env.bind(var, (*other).clone());
            Some((*other).clone())
        }
        (other, &Value::Var(ref var)) => {
            env.bind(var, (*other).clone());
            Some((*other).clone())
        }
        (&Value::Disj(ref alts), other) | (other, &Value::Disj(ref alts)) => {
            // Commits to the first alternative that unifies, in declaration
            // order. Trials run on a scratch environment so a failed
            // alternative leaves no residue.
            for alt in alts {
                let mut trial = env.clone();
                if let Some(value) = unify_value(alt, other, &mut trial) {
                    *env = trial;
                    return Some(value);
                }
            }
            None
        }
        (&Value::Conj(ref parts), other) | (other, &Value::Conj(ref parts)) => {
            let mut accumulated = (*other).clone();
            for part in parts {
                accumulated = unify_value(part, &accumulated, env)?;
            }
            Some(accumulated)
        }
        (&Value::Atom(ref a1), &Value::Atom(ref a2)) => {
            if a1 == a2 {
                Some(Value::Atom(a1.clone()))
            } else {
                None
            }
        }
        (&Value::Structure(ref f1), &Value::Structure(ref f2)) => {
            unify_fs(f1, f2, env).map(Value::Structure)
        }
        _ => None,
    }
}
