//! The gatherer: collects statuses, topologically sorts structs by
//! field-type dependency, and pre-computes the initial per-function
//! `Funk` records (identity + declared locals) that later analysis
//! passes mutate in place.
//!
//! The struct dependency sort below is a plain recursive-DFS topological
//! sort with three-colour cycle detection. Unlike a call graph, where a
//! cycle just means mutual recursion (allowed), a cycle among struct
//! field types is fatal: a struct literally containing itself has no
//! finite layout.

use std::collections::HashMap;

use crate::ast::{File, Func, StructDecl, TypeExpr};
use crate::error::GenError;
use crate::funk::Funk;
use crate::status::{self, Status};

/// Everything the gatherer produces for one package: the numbered status
/// table, the package id, the dependency-sorted struct list, and the
/// per-function `Funk` scaffolding.
pub struct Gathered {
    pub statuses: Vec<Status>,
    pub pkg_id: u32,
    pub structs: Vec<StructDecl>,
    pub funks: Vec<Funk>,
}

fn collect_named_deps(ty: &TypeExpr, acc: &mut Vec<String>) {
    match ty {
        TypeExpr::Array { elem, .. } => collect_named_deps(elem, acc),
        TypeExpr::Pointer { inner, .. } => collect_named_deps(inner, acc),
        TypeExpr::Named { pkg: None, name } => acc.push(name.clone()),
        _ => {}
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Topologically sort `structs` so that every struct appears after the
/// same-package structs its fields depend on. Fields referencing a
/// `use`d package's struct never contribute an edge (that package is
/// already fully defined by the time this one compiles).
fn topo_sort_structs(structs: &[StructDecl], names: &HashMap<String, &str>) -> Result<Vec<usize>, GenError> {
    let mut deps: Vec<Vec<usize>> = vec![Vec::new(); structs.len()];
    let mut by_name: HashMap<String, usize> = HashMap::new();
    for (i, _s) in structs.iter().enumerate() {
        by_name.insert(names[&i.to_string()].to_string(), i);
    }
    for (i, s) in structs.iter().enumerate() {
        let mut dep_names = Vec::new();
        for f in &s.fields {
            collect_named_deps(&f.ty, &mut dep_names);
        }
        for dep_name in dep_names {
            if let Some(&dep_idx) = by_name.get(&dep_name) {
                if dep_idx != i {
                    deps[i].push(dep_idx);
                }
            }
        }
    }

    let mut color = vec![Color::White; structs.len()];
    let mut order = Vec::with_capacity(structs.len());
    let mut stack_path: Vec<usize> = Vec::new();

    fn visit(
        i: usize,
        deps: &[Vec<usize>],
        color: &mut [Color],
        order: &mut Vec<usize>,
        stack_path: &mut Vec<usize>,
        names: &HashMap<String, usize>,
    ) -> Result<(), GenError> {
        match color[i] {
            Color::Black => return Ok(()),
            Color::Gray => {
                let cycle_start = stack_path.iter().position(|&n| n == i).unwrap_or(0);
                let idx_to_name: HashMap<usize, &str> =
                    names.iter().map(|(k, v)| (*v, k.as_str())).collect();
                let mut cycle: Vec<String> = stack_path[cycle_start..]
                    .iter()
                    .map(|n| idx_to_name.get(n).copied().unwrap_or("?").to_string())
                    .collect();
                cycle.push(idx_to_name.get(&i).copied().unwrap_or("?").to_string());
                return Err(GenError::CyclicStructs { cycle });
            }
            Color::White => {}
        }
        color[i] = Color::Gray;
        stack_path.push(i);
        for &dep in &deps[i] {
            visit(dep, deps, color, order, stack_path, names)?;
        }
        stack_path.pop();
        color[i] = Color::Black;
        order.push(i);
        Ok(())
    }

    for i in 0..structs.len() {
        visit(i, &deps, &mut color, &mut order, &mut stack_path, &by_name)?;
    }

    Ok(order)
}

fn func_c_name(file: &File, pkg_lower: &str, func: &Func) -> String {
    match func.receiver {
        Some(r) => format!("wuffs_{}__{}__{}", pkg_lower, file.name(r), file.name(func.name)),
        None => format!("wuffs_{}__{}", pkg_lower, file.name(func.name)),
    }
}

/// Run the gatherer over one checked `File`.
pub fn gather(file: &File, pkg_lower: &str, pkg_upper: &str) -> Result<Gathered, GenError> {
    let statuses = status::gather_statuses(pkg_lower, pkg_upper, &file.statuses)?;
    let pkg_id = status::package_id(pkg_lower)?;

    let mut names: HashMap<String, &str> = HashMap::new();
    for (i, s) in file.structs.iter().enumerate() {
        names.insert(i.to_string(), file.name(s.name));
    }
    let order = topo_sort_structs(&file.structs, &names)?;
    let structs = order.into_iter().map(|i| file.structs[i].clone()).collect();

    let mut funks = Vec::with_capacity(file.funcs.len());
    for func in &file.funcs {
        let c_name = func_c_name(file, pkg_lower, func);
        let mut funk = Funk::new(func.name, func.receiver, func.public, func.coroutine, c_name);
        funk.var_list = func.locals.iter().map(|l| l.name).collect();
        funks.push(funk);
    }

    Ok(Gathered {
        statuses,
        pkg_id,
        structs,
        funks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Field, Interner, StructDecl};

    fn struct_with_field(name: &str, field_name: &str, field_ty: TypeExpr, interner: &mut Interner) -> StructDecl {
        StructDecl {
            name: interner.intern(name),
            public: true,
            classy: false,
            fields: vec![Field {
                name: interner.intern(field_name),
                ty: field_ty,
            }],
        }
    }

    #[test]
    fn topo_sort_orders_dependencies_first() {
        let mut interner = Interner::new();
        // `outer` has a field of type `inner`; `inner` must come first.
        let inner = struct_with_field("inner", "x", TypeExpr::U8, &mut interner);
        let outer = struct_with_field(
            "outer",
            "f",
            TypeExpr::Named {
                pkg: None,
                name: "inner".to_string(),
            },
            &mut interner,
        );
        let structs = vec![outer, inner];
        let mut names = HashMap::new();
        for (i, s) in structs.iter().enumerate() {
            names.insert(i.to_string(), interner.resolve(s.name));
        }
        let order = topo_sort_structs(&structs, &names).unwrap();
        let sorted: Vec<&str> = order.iter().map(|&i| interner.resolve(structs[i].name)).collect();
        assert_eq!(sorted, vec!["inner", "outer"]);
    }

    #[test]
    fn topo_sort_rejects_cycles() {
        let mut interner = Interner::new();
        let a = struct_with_field(
            "a",
            "f",
            TypeExpr::Named {
                pkg: None,
                name: "b".to_string(),
            },
            &mut interner,
        );
        let b = struct_with_field(
            "b",
            "f",
            TypeExpr::Named {
                pkg: None,
                name: "a".to_string(),
            },
            &mut interner,
        );
        let structs = vec![a, b];
        let mut names = HashMap::new();
        for (i, s) in structs.iter().enumerate() {
            names.insert(i.to_string(), interner.resolve(s.name));
        }
        assert!(topo_sort_structs(&structs, &names).is_err());
    }
}
