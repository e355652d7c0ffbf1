//! The greedy construction loop.

use crate::point_cloud::{NodeKind, PointCloud};
use crate::{geom, Builder, Node, EPSILON};

const INIT_K: usize = 5;
// Bounds the K doubling so pathological inputs cannot search forever.
const K_MAX: usize = 1024;

struct NodeDistance {
  node_id: usize,
  dst_branching: f32,
}

/// Run the greedy build over an existing point cloud.
///
/// Nodes are processed highest first. For each node the `K` nearest
/// reachable candidates are tried in order of branching distance; `K`
/// doubles every time a node exhausts its candidates and resets on success.
/// Processing ends when the queue drains or the builder reports
/// cancellation.
pub fn build_tree(nodes: &mut PointCloud, builder: &mut dyn Builder) {
  let mut queue = nodes.start_queue();

  let mut distances: Vec<NodeDistance> = Vec::with_capacity(INIT_K);
  let mut prev_dist_max = 0f32;
  let mut k = INIT_K;
  let mut routed = true;
  let mut node_id = usize::MAX;

  while (!queue.is_empty() && builder.is_valid()) || !routed {
    if routed {
      match queue.pop() {
        Some(id) => node_id = id,
        None => break,
      }
    }

    let node = *nodes.get(node_id);
    nodes.mark_unreachable(node_id);

    distances.clear();
    let mut dmax = 0f32;
    nodes.foreach_reachable(node.pos, k, prev_dist_max, |id, dst_branching, dst_euql_sq| {
      distances.push(NodeDistance {
        node_id: id,
        dst_branching,
      });
      dmax = dmax.max(dst_euql_sq);
    });

    distances.sort_by(|a, b| a.dst_branching.total_cmp(&b.dst_branching));

    if distances.is_empty() {
      builder.report_unroutable(&node);
      k = INIT_K;
      prev_dist_max = 0.;
      routed = true;

      continue;
    }

    prev_dist_max = dmax;
    k = (k * 2).min(K_MAX);

    routed = false;
    let mut it = distances.iter();
    while let Some(closest) = it.next() {
      if routed || !builder.is_valid() {
        break;
      }

      let closest_node_id = closest.node_id;
      let mut closest_node = *nodes.get(closest_node_id);

      let kind = nodes.kind(closest_node_id);
      let mut w = nodes.get(node_id).weight + closest.dst_branching;
      closest_node.r_min = node.r_min.max(closest_node.r_min);

      match kind {
        NodeKind::Bed => {
          closest_node.weight = w;
          let max_br_len = nodes.properties().get_max_branch_length() as f32;

          if closest.dst_branching > max_br_len {
            // Too far for a direct ground bridge; ask for a waypoint that
            // sidesteps the model and retry from there.
            let Some(avo) = builder.suggest_avoidance(&node, max_br_len) else {
              continue;
            };

            let mut new_node = Node::new(avo, node.r_min);
            new_node.weight = nodes.get(node_id).weight + (node.pos - avo).length();
            new_node.left = node.id;
            routed = builder.add_bridge(&node, &new_node);
            if routed {
              let new_idx = nodes.insert_junction(new_node);
              let z = nodes.get(new_idx).pos.z;
              queue.push(new_idx, z);
            }
          } else {
            routed = builder.add_ground_bridge(&node, &closest_node);
            if routed {
              closest_node.left = node_id as i32;
              closest_node.right = node_id as i32;
              *nodes.get_mut(closest_node_id) = closest_node;
              nodes.mark_unreachable(closest_node_id);
            }
          }
        }
        NodeKind::Mesh => {
          closest_node.weight = w;
          routed = builder.add_mesh_bridge(&node, &closest_node);
          if routed {
            closest_node.left = node_id as i32;
            closest_node.right = node_id as i32;
            *nodes.get_mut(closest_node_id) = closest_node;
            nodes.mark_unreachable(closest_node_id);
          }
        }
        NodeKind::Leaf | NodeKind::Junction => {
          let max_slope = nodes.properties().get_max_slope() as f32;

          if let Some(merge_pt) = geom::find_merge_pt(node.pos, closest_node.pos, max_slope) {
            let mergedist_closest = (merge_pt - closest_node.pos).length();
            let mergedist_node = (merge_pt - node.pos).length();
            let w_node = nodes.get(node_id).weight;
            let w_closest = nodes.get(closest_node_id).weight;
            w = w_node.max(w_closest) + mergedist_closest.max(mergedist_node);

            if mergedist_closest > EPSILON && mergedist_node > EPSILON {
              let mut merge_node = Node::new(merge_pt, closest_node.r_min);
              merge_node.weight = w;
              merge_node.id = nodes.next_junction_id() as i32;

              routed = builder.add_merger(&node, &closest_node, &merge_node);
              if routed {
                merge_node.left = node_id as i32;
                merge_node.right = closest_node_id as i32;
                let new_idx = nodes.insert_junction(merge_node);
                queue.push(new_idx, merge_pt.z);
                queue.remove(closest_node_id);
                nodes.mark_unreachable(closest_node_id);
              }
            } else if closest_node.pos.z < node.pos.z
              && (closest_node.left == Node::ID_NONE || closest_node.right == Node::ID_NONE)
            {
              // Degenerate merge point: the lower node absorbs the upper
              // one directly, if it still has a free child slot.
              closest_node.weight = w;
              routed = builder.add_bridge(&node, &closest_node);
              if routed {
                if closest_node.left == Node::ID_NONE {
                  closest_node.left = node_id as i32;
                } else {
                  closest_node.right = node_id as i32;
                }

                *nodes.get_mut(closest_node_id) = closest_node;
              }
            }
          }
        }
      }
    }

    if routed {
      prev_dist_max = 0.;
      k = INIT_K;
    }
  }
}

#[cfg(test)]
#[path = "build_test.rs"]
mod build_test;
