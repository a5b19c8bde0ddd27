use crate::opdo::ChildPdo;
use finality_types::PdoId;
use std::collections::BTreeMap;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

/// First dependency cycle among `children`, as a closed path
/// (`[a, b, a]`). Dependencies on ids outside the set are ignored here;
/// they are reported separately as missing.
pub fn find_cycle(children: &[ChildPdo]) -> Option<Vec<PdoId>> {
    let index: BTreeMap<&PdoId, usize> = children
        .iter()
        .enumerate()
        .map(|(i, c)| (&c.pdo_id, i))
        .collect();
    let edges: Vec<Vec<usize>> = children
        .iter()
        .map(|c| {
            c.dependencies
                .iter()
                .filter_map(|d| index.get(d).copied())
                .collect()
        })
        .collect();

    let mut marks = vec![Mark::White; children.len()];
    for start in 0..children.len() {
        if marks[start] != Mark::White {
            continue;
        }
        // (node, next edge to visit)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        marks[start] = Mark::Gray;

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            top.1 += 1;
            let Some(&target) = edges[node].get(next) else {
                marks[node] = Mark::Black;
                stack.pop();
                continue;
            };
            match marks[target] {
                Mark::White => {
                    marks[target] = Mark::Gray;
                    stack.push((target, 0));
                }
                Mark::Gray => {
                    let from = stack.iter().position(|(n, _)| *n == target).unwrap_or(0);
                    let mut path: Vec<PdoId> = stack[from..]
                        .iter()
                        .map(|(n, _)| children[*n].pdo_id.clone())
                        .collect();
                    path.push(children[target].pdo_id.clone());
                    return Some(path);
                }
                Mark::Black => {}
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use finality_types::ContentHash;

    fn child(id: &str, deps: &[&str]) -> ChildPdo {
        ChildPdo::new(
            PdoId::new(id),
            format!("agent-{id}"),
            "TASK-1",
            ContentHash::hash(id.as_bytes()),
        )
        .with_validation_record(format!("BER-{id}"))
        .with_dependencies(deps.iter().map(|d| PdoId::new(*d)).collect())
    }

    fn ids(path: &[PdoId]) -> Vec<&str> {
        path.iter().map(PdoId::as_str).collect()
    }

    #[test]
    fn acyclic_set() {
        let set = vec![child("a", &[]), child("b", &["a"]), child("c", &["a", "b"])];
        assert_eq!(find_cycle(&set), None);
    }

    #[test]
    fn two_cycle() {
        let set = vec![child("a", &["b"]), child("b", &["a"])];
        assert_eq!(ids(&find_cycle(&set).unwrap()), vec!["a", "b", "a"]);
    }

    #[test]
    fn self_loop() {
        let set = vec![child("a", &[]), child("b", &["b"])];
        assert_eq!(ids(&find_cycle(&set).unwrap()), vec!["b", "b"]);
    }

    #[test]
    fn cycle_behind_a_tail() {
        let set = vec![
            child("root", &["x"]),
            child("x", &["y"]),
            child("y", &["z"]),
            child("z", &["x"]),
        ];
        assert_eq!(ids(&find_cycle(&set).unwrap()), vec!["x", "y", "z", "x"]);
    }

    #[test]
    fn outside_dependencies_are_skipped() {
        let set = vec![child("a", &["ghost"])];
        assert_eq!(find_cycle(&set), None);
    }
}
