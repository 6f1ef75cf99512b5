//! Exception walker — where does a thrown value go next?
//!
//! Given the throw site and the thrown type, climb the syntactic parent
//! chain. The first enclosing try statement with a matching catch
//! clause captures the exception; a try with no matching clause but a
//! finally block routes through the finally on the exit path; with no
//! enclosing try left, the exception leaves the method.

use crate::base::{BlockId, Name, TreeId};
use crate::syntax::{SymbolTable, TreeArena, TreeKind};

/// One continuation of an in-flight exception.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExceptionRoute {
    /// A catch clause captures it: enqueue the handler block entry.
    Catch(BlockId),
    /// A finally block runs first, on the exit path.
    Finally(BlockId),
    /// Uncaught: register an exceptional yield at the method exit.
    MethodExit,
}

/// Compute every continuation for an exception of type `thrown`
/// (`None` when statically unknown) raised at `site`.
///
/// A known type takes exactly one route. An unknown type may match any
/// clause or none, so every candidate route is returned.
pub fn exception_routes(
    arena: &TreeArena,
    oracle: &SymbolTable,
    site: TreeId,
    thrown: Option<&Name>,
) -> Vec<ExceptionRoute> {
    for ancestor in arena.ancestors(site) {
        let TreeKind::Try { catches, finally } = arena.kind(ancestor) else {
            continue;
        };
        match thrown {
            Some(ty) => {
                let matched = catches.iter().find(|clause| match &clause.exception {
                    Some(caught) => oracle.is_subtype(ty, caught),
                    None => true,
                });
                if let Some(clause) = matched {
                    return vec![ExceptionRoute::Catch(clause.block)];
                }
                if let Some(finally_block) = finally {
                    return vec![ExceptionRoute::Finally(*finally_block)];
                }
                // no handler here, keep climbing
            }
            None => {
                // unknown type: any clause may match, but a catch-all
                // always does and nothing escapes past it
                let mut routes = Vec::new();
                let mut caught_all = false;
                for clause in catches {
                    routes.push(ExceptionRoute::Catch(clause.block));
                    if clause.exception.is_none() {
                        caught_all = true;
                        break;
                    }
                }
                if !caught_all {
                    match finally {
                        Some(finally_block) => {
                            routes.push(ExceptionRoute::Finally(*finally_block));
                        }
                        None => routes.push(ExceptionRoute::MethodExit),
                    }
                }
                return routes;
            }
        }
    }
    vec![ExceptionRoute::MethodExit]
}
