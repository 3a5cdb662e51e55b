use super::{ActionNode, BranchArm, ScopePath};
use crate::flow::{ActionDefinition, ActionKind};
use indexmap::IndexMap;

/// An action waiting to be emitted, with the arena slot of its parent and
/// the scope it lands in.
struct Pending {
    name: String,
    action: ActionDefinition,
    parent: Option<usize>,
    scope: ScopePath,
}

/// Flattens the nested tree into depth-first document order using an
/// explicit work stack, so pathological nesting never grows the call stack.
pub(super) fn flatten(actions: IndexMap<String, ActionDefinition>) -> Vec<ActionNode> {
    let mut nodes: Vec<ActionNode> = Vec::new();
    let mut stack: Vec<Pending> = Vec::new();
    push_in_order(&mut stack, actions, None, &ScopePath::root());

    while let Some(Pending {
        name,
        action,
        parent,
        scope,
    }) = stack.pop()
    {
        let ActionDefinition {
            kind,
            entity,
            inputs,
            expression,
            foreach,
            actions: children,
            else_actions,
        } = action;

        let index = nodes.len();
        nodes.push(ActionNode {
            index,
            name: name.clone(),
            kind,
            entity,
            inputs,
            expression,
            foreach,
            parent,
            scope: scope.clone(),
        });

        // Later pushes pop first, so the false branch goes on the stack
        // before the true branch to keep true-before-false enumeration.
        if kind == ActionKind::Condition {
            let else_scope = scope.child(&name, Some(BranchArm::Else));
            push_in_order(&mut stack, else_actions, Some(index), &else_scope);
            let then_scope = scope.child(&name, Some(BranchArm::Then));
            push_in_order(&mut stack, children, Some(index), &then_scope);
        } else {
            let body_scope = scope.child(&name, None);
            push_in_order(&mut stack, else_actions, Some(index), &body_scope);
            push_in_order(&mut stack, children, Some(index), &body_scope);
        }
    }

    nodes
}

/// Pushes siblings reversed so they pop in document order.
fn push_in_order(
    stack: &mut Vec<Pending>,
    children: IndexMap<String, ActionDefinition>,
    parent: Option<usize>,
    scope: &ScopePath,
) {
    for (name, action) in children.into_iter().rev() {
        stack.push(Pending {
            name,
            action,
            parent,
            scope: scope.clone(),
        });
    }
}
