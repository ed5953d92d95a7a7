// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish a
// specific goal (preparing splits or inspecting a cache).
//
// Rules for this layer:
//   - No alignment or cleaning logic here (that's Layer 4)
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

// The load → align → split workflow
pub mod prepare_use_case;

// The cache inspection workflow
pub mod inspect_use_case;
