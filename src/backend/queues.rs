// Queue family resolution
//
// Maps the two operation classes we need (graphics submission and
// presentation) to queue family indices. First match wins for each role and
// a single family may serve both.

use ash::prelude::VkResult;
use ash::vk;

use super::error::{ContextError, ContextResult};

/// Per-candidate queue assignment; complete iff both roles are filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Turn the assignment into concrete indices.
    ///
    /// A selected device that fails here means scoring and resolution
    /// disagree, so it is logged as a defect, not a regular runtime error.
    pub fn resolve(&self) -> ContextResult<ResolvedQueues> {
        match (self.graphics, self.present) {
            (Some(graphics), Some(present)) => Ok(ResolvedQueues { graphics, present }),
            (graphics, _) => {
                let missing = if graphics.is_none() { "graphics" } else { "present" };
                log::error!(
                    "Queue layout of the selected GPU is incomplete ({} missing); \
                     device scoring should have rejected it",
                    missing
                );
                Err(ContextError::IncompleteQueueLayout { missing })
            }
        }
    }
}

/// Queue family indices of the chosen device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedQueues {
    pub graphics: u32,
    pub present: u32,
}

impl ResolvedQueues {
    /// True when one family serves both graphics and presentation.
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Distinct families, graphics first. One queue is created per entry.
    pub fn unique_families(&self) -> Vec<u32> {
        if self.is_shared() {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Scan `families` in order and record the first graphics-capable family
/// and the first family that can present, asking `supports_present` per index.
///
/// Stops as soon as both roles are filled; `supports_present` is not called
/// again once a present family has been found.
pub fn find_queue_families<F>(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: F,
) -> VkResult<QueueFamilyIndices>
where
    F: FnMut(u32) -> VkResult<bool>,
{
    let mut indices = QueueFamilyIndices::default();

    for (index, family) in families.iter().enumerate() {
        let index = index as u32;

        if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            indices.graphics = Some(index);
        }

        if indices.present.is_none() && supports_present(index)? {
            indices.present = Some(index);
        }

        if indices.is_complete() {
            break;
        }
    }

    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn combined_family_serves_both_roles() {
        let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)];
        let indices = find_queue_families(&families, |_| Ok(true)).unwrap();

        assert_eq!(indices.graphics, Some(0));
        assert_eq!(indices.present, Some(0));
        let queues = indices.resolve().unwrap();
        assert!(queues.is_shared());
        assert_eq!(queues.unique_families(), vec![0]);
    }

    #[test]
    fn first_match_wins_for_each_role() {
        let families = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::COMPUTE),
        ];
        // Presentation only on families 2 and 3.
        let indices = find_queue_families(&families, |i| Ok(i >= 2)).unwrap();

        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, Some(2));
        let queues = indices.resolve().unwrap();
        assert!(!queues.is_shared());
        assert_eq!(queues.unique_families(), vec![1, 2]);
    }

    #[test]
    fn scan_stops_once_complete() {
        let families = [
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS),
        ];
        let mut queried = Vec::new();
        find_queue_families(&families, |i| {
            queried.push(i);
            Ok(true)
        })
        .unwrap();

        assert_eq!(queried, vec![0]);
    }

    #[test]
    fn missing_present_support_is_incomplete() {
        let families = [family(vk::QueueFlags::GRAPHICS)];
        let indices = find_queue_families(&families, |_| Ok(false)).unwrap();

        assert!(!indices.is_complete());
        assert!(matches!(
            indices.resolve(),
            Err(ContextError::IncompleteQueueLayout { missing: "present" })
        ));
    }

    #[test]
    fn missing_graphics_is_reported_first() {
        let families = [family(vk::QueueFlags::COMPUTE)];
        let indices = find_queue_families(&families, |_| Ok(true)).unwrap();

        assert_eq!(indices.present, Some(0));
        assert!(matches!(
            indices.resolve(),
            Err(ContextError::IncompleteQueueLayout { missing: "graphics" })
        ));
    }

    #[test]
    fn driver_errors_propagate() {
        let families = [family(vk::QueueFlags::GRAPHICS)];
        let result = find_queue_families(&families, |_| Err(vk::Result::ERROR_SURFACE_LOST_KHR));
        assert_eq!(result, Err(vk::Result::ERROR_SURFACE_LOST_KHR));
    }
}
